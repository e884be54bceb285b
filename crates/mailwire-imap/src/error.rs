//! Error types for the IMAP library.

use std::io;

use thiserror::Error;

/// Errors that can occur during IMAP operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed wire token.
    #[error("Protocol error at position {position}: {message}")]
    Parse {
        /// Byte position where the error occurred.
        position: usize,
        /// Description of what went wrong.
        message: String,
    },

    /// The input ended in the middle of a token.
    #[error("Response truncated at position {position}")]
    Truncated {
        /// Byte position where more input was expected.
        position: usize,
    },

    /// The session's connection is gone.
    #[error("Session closed: {0}")]
    SessionClosed(String),

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Protocol-level failure other than connection loss.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A fetch that should have produced data produced none.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The owning message was expunged from the server.
    #[error("Message has been removed from the mailbox")]
    MessageRemoved,

    /// Encoded text could not be decoded.
    #[error("Decoding error: {0}")]
    Decoding(String),
}

impl Error {
    /// Returns true if this error means the connection can no longer be used.
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        match self {
            Self::SessionClosed(_) | Self::Truncated { .. } => true,
            Self::Io(err) => matches!(
                err.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::NotConnected
            ),
            _ => false,
        }
    }
}

impl From<mailwire_mime::Error> for Error {
    fn from(err: mailwire_mime::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
