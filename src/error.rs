//! Global error handling module for the marketplace scraper
//!
//! The pipeline itself degrades to empty results instead of failing (see
//! [`crate::search`]); this type covers what the binary and configuration
//! loading can still fail on.

use thiserror::Error;

/// Application-wide error type that unifies all error sources
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command line input
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(msg) => format!("Invalid configuration: {}", msg),
            AppError::Validation(msg) => msg.clone(),
            AppError::Serialization(_) => "Failed to encode results".to_string(),
        }
    }
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let error = AppError::config("SEARCH_LIMIT must be a valid number");
        assert_eq!(
            error.user_message(),
            "Invalid configuration: SEARCH_LIMIT must be a valid number"
        );
    }

    #[test]
    fn test_validation_error_message() {
        let error = AppError::validation("At least one keyword is required");
        assert_eq!(error.user_message(), "At least one keyword is required");
    }

    #[test]
    fn test_error_display() {
        let error = AppError::config("bad value");
        assert_eq!(format!("{}", error), "Configuration error: bad value");

        let error = AppError::validation("no keywords");
        assert_eq!(format!("{}", error), "Validation error: no keywords");
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let app_err: AppError = serde_err.into();
        assert!(matches!(app_err, AppError::Serialization(_)));
        assert_eq!(app_err.user_message(), "Failed to encode results");
    }
}
