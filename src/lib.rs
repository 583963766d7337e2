//! Standalone Sass - supervised stylesheet compilation with an optional
//! PostCSS pass and watch mode.

pub mod compiler;
pub mod config;
pub mod display;
pub mod session;
