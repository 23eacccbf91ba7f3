//! Custom error types for scholarboard.
//!
//! This module defines all error types used throughout the application.
//! All functions return `Result<T, MetricsError>` instead of using `unwrap()`.

use thiserror::Error;

/// Main error type for scholarboard operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML parsing error or malformed profile page
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by Google Scholar
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External service returned an error status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message
        message: String,
    },

    /// CAPTCHA detected
    #[error("CAPTCHA detected, please refresh cookies")]
    Captcha,

    /// Unknown author identifier or scientist name
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// User input validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl MetricsError {
    /// Whether the error came from user input rather than the external service or storage.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

/// Result type alias using `MetricsError`
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| MetricsError::Parse(msg.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_or_parse() {
        let missing: Option<u32> = None;
        let err = missing.ok_or_parse("no stats table").expect_err("should fail");
        assert_eq!(err.to_string(), "Parse error: no stats table");
        assert_eq!(Some(3).ok_or_parse("unused").expect("present"), 3);
    }

    #[test]
    fn test_user_errors() {
        assert!(MetricsError::Validation("empty".into()).is_user_error());
        assert!(MetricsError::NotFound("x".into()).is_user_error());
        assert!(!MetricsError::Captcha.is_user_error());
    }
}
