//! Error types for the heap client.

use rheap_core::protocol::{ErrorKind, Reply};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when using remote handles.
#[derive(Debug, Error)]
pub enum ClientError {
    // Reported by the server
    /// The server has no room for the block.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// The block id is unknown or already reclaimed.
    #[error("Invalid block id: {0}")]
    InvalidId(String),

    /// A write was larger than the block.
    #[error("Size mismatch: {0}")]
    SizeMismatch(String),

    /// The server does not know the element type.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// The request resolved to zero bytes.
    #[error("Zero-sized allocation: {0}")]
    ZeroSized(String),

    /// The server failed for reasons unrelated to the request.
    #[error("Server error: {0}")]
    Server(String),

    // Local to the client
    /// A handle operation needed a bound handle.
    #[error("Dereference of a null handle")]
    NullDereference,

    /// The server could not be reached.
    #[error("Connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// The call did not finish within the client deadline.
    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    /// A value could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The server answered outside the protocol.
    #[error("Protocol error (status {status}): {message}")]
    Protocol {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },
}

impl ClientError {
    /// Build the error for a failed protocol response.
    pub fn from_reply(reply: &impl Reply) -> Self {
        let message = reply.error_message().to_string();
        match reply.error_kind() {
            Some(ErrorKind::OutOfMemory) => Self::OutOfMemory(message),
            Some(ErrorKind::InvalidId) => Self::InvalidId(message),
            Some(ErrorKind::SizeMismatch) => Self::SizeMismatch(message),
            Some(ErrorKind::UnsupportedType) => Self::UnsupportedType(message),
            Some(ErrorKind::ZeroSized) => Self::ZeroSized(message),
            Some(ErrorKind::Internal) => Self::Server(message),
            None => Self::Protocol {
                status: 200,
                message: format!("failure without error kind: {message}"),
            },
        }
    }

    /// The wire-level kind, for errors reported by the server.
    pub fn remote_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::OutOfMemory(_) => Some(ErrorKind::OutOfMemory),
            Self::InvalidId(_) => Some(ErrorKind::InvalidId),
            Self::SizeMismatch(_) => Some(ErrorKind::SizeMismatch),
            Self::UnsupportedType(_) => Some(ErrorKind::UnsupportedType),
            Self::ZeroSized(_) => Some(ErrorKind::ZeroSized),
            Self::Server(_) => Some(ErrorKind::Internal),
            _ => None,
        }
    }

    /// Whether the failure happened in transport rather than on the server.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionUnavailable(_) | Self::DeadlineExceeded(_) | Self::Protocol { .. }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol {
                status: err.status().map(|s| s.as_u16()).unwrap_or(200),
                message: err.to_string(),
            }
        } else {
            Self::ConnectionUnavailable(err.to_string())
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
