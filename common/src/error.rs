//! Error taxonomy shared by the Cambio crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error raised when building a [`crate::CurrencyCode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurrencyCodeError {
    /// The code was empty after trimming.
    #[error("Currency code cannot be empty")]
    Empty,
}

/// Coarse classification of every error the exchange core can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Same currency on both sides of a pair.
    InvalidPair,
    /// No rate path between two currencies.
    NotFound,
    /// The calculator could not produce a number.
    Unavailable,
    /// A wizard transition was blocked by missing input.
    ValidationFailed,
    /// Programmer error, such as removing the last line.
    InvariantViolation,
    /// An operation was called in a step that does not allow it.
    InvalidTransition,
    /// The submission adapter failed to deliver the order.
    Network,
    /// Client-side storage could not be read or written.
    Storage,
    /// Configuration is invalid or could not be loaded.
    Configuration,
}

impl ErrorKind {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidPair => "INVALID_PAIR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unavailable => "UNAVAILABLE",
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::InvariantViolation => "INVARIANT_VIOLATION",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Storage => "STORAGE_ERROR",
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
        }
    }

    /// Whether the error should be shown to the user.
    ///
    /// Unavailable quotes are recovered locally and invariant violations
    /// are bugs, so neither is user facing.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, ErrorKind::ValidationFailed | ErrorKind::Network)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Implemented by every crate error so callers can branch on the kind.
pub trait Classify {
    /// Get the error kind.
    fn kind(&self) -> ErrorKind;

    /// Get error code for notifications and logs.
    fn error_code(&self) -> &'static str {
        self.kind().code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidPair.code(), "INVALID_PAIR");
        assert_eq!(ErrorKind::Network.to_string(), "NETWORK_ERROR");
    }

    #[test]
    fn test_user_facing_kinds() {
        assert!(ErrorKind::ValidationFailed.is_user_facing());
        assert!(ErrorKind::Network.is_user_facing());
        assert!(!ErrorKind::Unavailable.is_user_facing());
        assert!(!ErrorKind::InvariantViolation.is_user_facing());
    }
}
