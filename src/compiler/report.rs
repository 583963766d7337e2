//! Structured decoding of compiler failure output.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Message used when the failure payload is not machine-readable.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// CSI-style terminal escape sequences.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x1b\x{9b}][\[()#;?]*(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-ORZcf-nqry=><]")
        .expect("escape sequence pattern is valid")
});

fn unknown_error() -> String {
    UNKNOWN_ERROR.to_string()
}

/// A compiler failure, decoded from an error event payload.
///
/// Fields the compiler did not report stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u64>,
    #[serde(default)]
    pub column: Option<u64>,
    #[serde(default = "unknown_error")]
    pub message: String,
    #[serde(default)]
    pub formatted: Option<String>,
}

impl Default for ErrorReport {
    fn default() -> Self {
        Self {
            status: None,
            file: None,
            line: None,
            column: None,
            message: unknown_error(),
            formatted: None,
        }
    }
}

impl ErrorReport {
    /// Decode a raw error payload.
    ///
    /// Terminal escape sequences are stripped first. Anything that is not a
    /// JSON object yields [`ErrorReport::default`]; this never fails.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_ansi(raw);
        match serde_json::from_str(cleaned.trim()) {
            Ok(report) => report,
            Err(e) => {
                tracing::debug!(error = %e, "Error output is not structured, using fallback report");
                Self::default()
            }
        }
    }

    /// Returns true if nothing beyond the fallback message was decoded.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        *self == Self::default()
    }
}

/// Remove terminal escape sequences from `text`.
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}
