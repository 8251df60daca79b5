//! Error types for mockchat

use thiserror::Error;

/// The main error type for mockchat operations
#[derive(Error, Debug)]
pub enum Error {
    /// An identity with this email is already registered
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// No identity matches the supplied email and secret
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Blank text with no attachments
    #[error("Message is empty")]
    EmptyMessage,

    /// Persisted state could not be decoded
    #[error("Corrupt state in '{key}': {reason}")]
    CorruptState { key: String, reason: String },

    /// No session is present
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for mockchat operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the user can fix this by retrying with different input
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Error::AlreadyExists(_)
                | Error::InvalidCredentials
                | Error::NotFound(_)
                | Error::EmptyMessage
                | Error::Unauthorized(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
