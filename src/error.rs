//! Error types for Turnstile.

use thiserror::Error;

/// Main error type for Turnstile operations.
///
/// `admit` never fails: a rejected request is a `false` decision, not an
/// error. Only construction and configuration loading produce these.
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Unrecognized rate limiter type; carries the caller's original string.
    #[error("Unknown rate limiter type: {0}")]
    InvalidArgument(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for TurnstileError {
    fn from(err: ::config::ConfigError) -> Self {
        TurnstileError::Config(err.to_string())
    }
}

/// Result type alias for Turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
