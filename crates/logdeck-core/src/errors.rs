//! Error formatting utilities
//!
//! Transforms technical fetch-error text into actionable, human-readable
//! messages for the status line and the error screen.

/// Format a raw fetch error into a user-friendly message
///
/// # Examples
///
/// ```
/// use logdeck_core::errors::format_fetch_error;
///
/// let message = format_fetch_error("connection refused (os error 111)");
/// assert!(message.contains("refused"));
/// ```
pub fn format_fetch_error(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "Request timed out - the event feed may be slow or unreachable".to_string()
    } else if lower.contains("refused") {
        "Connection refused - is the event feed reachable?".to_string()
    } else if lower.contains("no such file") || lower.contains("not found") {
        "Event feed not found - check the source path".to_string()
    } else if lower.contains("permission denied") {
        "Permission denied reading the event feed".to_string()
    } else if lower.contains("reset") {
        "Connection reset by peer".to_string()
    } else if lower.contains("malformed") || lower.contains("invalid") || lower.contains("parse") {
        format!("Feed returned malformed data: {raw}")
    } else {
        format!("Fetch failed: {raw}")
    }
}

/// Categorize a fetch error for display purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network or file access issues; usually transient
    Transient,
    /// The feed returned something that is not a page of events
    Malformed,
    /// Everything else
    Other,
}

impl ErrorCategory {
    /// Get a short label for the category
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "Connection",
            ErrorCategory::Malformed => "Bad Data",
            ErrorCategory::Other => "Error",
        }
    }
}

/// Categorize a raw fetch error message
pub fn categorize_fetch_error(raw: &str) -> ErrorCategory {
    let lower = raw.to_lowercase();
    if lower.contains("malformed") || lower.contains("parse") || lower.contains("invalid") {
        ErrorCategory::Malformed
    } else if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("refused")
        || lower.contains("reset")
        || lower.contains("unreachable")
    {
        ErrorCategory::Transient
    } else {
        ErrorCategory::Other
    }
}
