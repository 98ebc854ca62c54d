//! Error types for notifiers and configuration.

use thiserror::Error;

/// Notifier failures - raised when a notice could not be delivered.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Notice rejected with status {0}")]
    Rejected(u16),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid user agent pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
