//! Error types for arteval operations.
//!
//! This module defines [`ArtevalError`], the crate-level error type, and a
//! [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `ArtevalError` for configuration and construction problems; these are
//!   programming errors in a bundle and surface before any check runs
//! - Environment, execution and data problems never become `ArtevalError`;
//!   they are reported as failed [`CheckResult`](crate::requirements::CheckResult)s
//! - Use `anyhow::Error` (via `ArtevalError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for arteval operations.
#[derive(Debug, Error)]
pub enum ArtevalError {
    /// Bundle file not found at the expected location.
    #[error("Bundle not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse a bundle file.
    #[error("Failed to parse bundle at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid bundle structure or values.
    #[error("Invalid bundle: {message}")]
    ConfigValidationError { message: String },

    /// A requirement was constructed with invalid parameters.
    #[error("Invalid requirement: {message}")]
    InvalidRequirement { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ArtevalError {
    /// Shorthand for [`ArtevalError::InvalidRequirement`].
    pub fn invalid(message: impl Into<String>) -> Self {
        ArtevalError::InvalidRequirement {
            message: message.into(),
        }
    }
}

/// Result type alias for arteval operations.
pub type Result<T> = std::result::Result<T, ArtevalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_not_found_displays_path() {
        let err = ArtevalError::ConfigNotFound {
            path: PathBuf::from("/foo/bundle.yml"),
        };
        assert!(err.to_string().contains("/foo/bundle.yml"));
    }

    #[test]
    fn config_parse_error_displays_path_and_message() {
        let err = ArtevalError::ConfigParseError {
            path: PathBuf::from("/bundle.yml"),
            message: "invalid syntax".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/bundle.yml"));
        assert!(msg.contains("invalid syntax"));
    }

    #[test]
    fn invalid_requirement_displays_message() {
        let err = ArtevalError::invalid("timeout must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid requirement: timeout must be > 0"
        );
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ArtevalError = io_err.into();
        assert!(matches!(err, ArtevalError::Io(_)));
    }

    #[test]
    fn anyhow_error_is_transparent() {
        let err: ArtevalError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
