//! Defines the application's primary error type `AppError` and a convenience `Result` alias.
//!
//! Uses the `thiserror` crate for ergonomic error definition and provides `From`
//! implementations to convert common external errors into `AppError` variants.
//! Errors that do not implement `Clone` are wrapped in `Arc` to allow `AppError` to be cloneable.

use std::sync::Arc;
use thiserror::Error;

/// The primary error enumeration for all application-specific errors.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Transport-level failure from the HTTP client (`reqwest`): DNS, connect, TLS.
    #[error("API Error: {0}")]
    Api(Arc<reqwest::Error>),

    /// The Supabase REST endpoint answered with a non-success status.
    #[error("Remote Error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Error during JSON parsing (`serde_json`). Wrapped in Arc as serde_json::Error is not Clone.
    #[error("JSON Parsing Error: {0}")]
    JsonParse(Arc<serde_json::Error>),

    /// Missing or invalid endpoint credentials.
    #[error("Configuration Error: {0}")]
    Config(String),

    /// Error related to standard I/O operations.
    #[error("I/O Error: {0}")]
    Io(Arc<std::io::Error>),

    /// Error specific to CLI logic or argument handling.
    #[error("CLI Error: {0}")]
    Cli(String),
}

impl AppError {
    /// Flattens a failed query into the single human-readable message shown after `Error: `.
    ///
    /// Remote failures surface the server's own message; everything else falls back to
    /// the underlying error's display text without the variant prefix.
    pub fn query_message(&self) -> String {
        match self {
            AppError::Api(e) => e.to_string(),
            AppError::Remote { message, .. } => message.clone(),
            AppError::JsonParse(e) => format!("invalid response body: {}", e),
            AppError::Config(msg) | AppError::Cli(msg) => msg.clone(),
            AppError::Io(e) => e.to_string(),
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Remote { status, .. } => Some(*status),
            AppError::Api(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// A specialized `Result` type using the application's `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// --- From implementations ---
// These allow easy conversion from external error types into AppError
// using the `?` operator. Arc is used for non-Clone error types.

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Api(Arc::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonParse(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_query_message_is_server_message() {
        let err = AppError::Remote {
            status: 401,
            message: "Invalid API key".to_string(),
        };
        assert_eq!(err.query_message(), "Invalid API key");
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Remote Error (401): Invalid API key");
    }

    #[test]
    fn test_json_parse_query_message() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(err.query_message().starts_with("invalid response body:"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        let cloned = err.clone();
        assert_eq!(cloned.query_message(), "boom");
    }
}
