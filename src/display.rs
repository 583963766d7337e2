//! Colored CLI display utilities for compiler output.
//!
//! This module provides functions for printing colored, formatted output
//! to the terminal while the compiler runs.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::compiler::ErrorReport;

/// Placeholder for a field the compiler did not report.
const MISSING: &str = "?";

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

fn or_missing<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

/// Plain-text lines of the failure banner.
#[must_use]
pub fn failure_banner(report: &ErrorReport) -> Vec<String> {
    let mut lines = vec![
        format!("Sass compilation failed status={}", or_missing(report.status)),
        format!(
            "file={} {}:{}",
            or_missing(report.file.as_deref()),
            or_missing(report.line),
            or_missing(report.column)
        ),
        report.message.clone(),
    ];
    if let Some(formatted) = &report.formatted {
        lines.push(formatted.clone());
    }
    lines
}

/// Print the failure banner for a compile error.
pub fn print_failure_banner(report: &ErrorReport) {
    let mut lines = failure_banner(report).into_iter();
    println!();
    if let Some(header) = lines.next() {
        eprintln!("{} {} {}", timestamp().dimmed(), "[FAILED]".red().bold(), header.red());
    }
    if let Some(location) = lines.next() {
        println!("{}", location.bold());
    }
    for line in lines {
        println!("{line}");
    }
    let _ = io::stdout().flush();
}

/// Print compiler text surfaced on success.
pub fn print_compiled(text: &str) {
    println!();
    println!("{text}");
    let _ = io::stdout().flush();
}

/// Print successful completion of a pipeline run.
pub fn print_success(output: &str, count: u64) {
    println!(
        "{} {} {} {}",
        timestamp().dimmed(),
        "[COMPILED]".green().bold(),
        output.cyan(),
        format!("#{count}").dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print incremental tool output verbatim.
pub fn print_change(text: &str) {
    print!("{}", text.dimmed());
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message.red());
}
