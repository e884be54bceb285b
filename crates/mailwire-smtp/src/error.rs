//! Error types for SMTP and SASL operations.

use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SMTP error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed server reply.
    #[error("Parse error: {0}")]
    Parse(String),

    /// SASL exchange could not proceed (bad challenge, missing nonce, bad base64).
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl Error {
    /// Creates an authentication error.
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::Auth(format!("invalid base64 payload: {err}"))
    }
}
