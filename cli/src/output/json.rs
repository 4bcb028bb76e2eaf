//! JSON output helpers.
//!
//! Every `--json` code path prints one pretty-printed document on stdout.
//! Failures print the error object instead.

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize `value` as the command's single JSON document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("JSON serialization failed")
}

/// Format the JSON error object:
///
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    render(&obj)
}
