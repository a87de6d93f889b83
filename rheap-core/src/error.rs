//! Error types for the remote heap.
//!
//! Every error carries a stable code so that operators can grep logs and
//! clients can match on the wire-level [`ErrorKind`] without parsing text.

use crate::protocol::ErrorKind;
use crate::types::BlockId;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for allocator operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    // =========================================================================
    // Request Errors (R001-R099)
    // =========================================================================
    /// Not enough contiguous or total space for the request.
    #[error(
        "R001: Out of memory: requested {requested} bytes, {available} bytes free of {total_size}"
    )]
    OutOfMemory {
        /// Number of bytes requested.
        requested: u64,
        /// Bytes not held by used blocks.
        available: u64,
        /// Total arena size.
        total_size: u64,
    },

    /// The id does not name a used block.
    #[error("R002: Invalid block id {id}")]
    InvalidId {
        /// The offending id.
        id: BlockId,
    },

    /// A write was larger than the block.
    #[error("R003: Size mismatch for block {id}: wrote {written} bytes into {size} bytes")]
    SizeMismatch {
        /// The block written to.
        id: BlockId,
        /// Payload length.
        written: u64,
        /// Block size.
        size: u64,
    },

    /// The element type tag is not recognised.
    #[error("R004: Unsupported element type '{name}'")]
    UnsupportedType {
        /// Name received from the client.
        name: String,
    },

    /// The request resolves to zero bytes.
    #[error("R005: Zero-sized allocation of {count} x {element_type}")]
    ZeroSized {
        /// Element type name.
        element_type: String,
        /// Element count.
        count: u64,
    },

    // =========================================================================
    // Internal Errors (R100-R199)
    // =========================================================================
    /// The block table violates one of its invariants.
    #[error("R101: Block table corruption: {cause}")]
    TableCorruption {
        /// What was found inconsistent.
        cause: String,
    },

    /// An arena access fell outside the buffer.
    #[error("R102: Arena access out of bounds: offset {offset}, len {len}, arena size {total_size}")]
    ArenaBounds {
        /// Start of the access.
        offset: u64,
        /// Length of the access.
        len: u64,
        /// Total arena size.
        total_size: u64,
    },

    // =========================================================================
    // Environment Errors (R200-R299)
    // =========================================================================
    /// Filesystem failure.
    #[error("R201: IO error at {path}: {cause}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Reason.
        cause: String,
    },

    /// Invalid configuration value.
    #[error("R202: Invalid configuration '{field}': {cause}")]
    Config {
        /// The field that failed validation.
        field: String,
        /// Reason.
        cause: String,
    },
}

impl HeapError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OutOfMemory { .. } => "R001",
            Self::InvalidId { .. } => "R002",
            Self::SizeMismatch { .. } => "R003",
            Self::UnsupportedType { .. } => "R004",
            Self::ZeroSized { .. } => "R005",
            Self::TableCorruption { .. } => "R101",
            Self::ArenaBounds { .. } => "R102",
            Self::Io { .. } => "R201",
            Self::Config { .. } => "R202",
        }
    }

    /// The wire-level kind reported to clients.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Self::InvalidId { .. } => ErrorKind::InvalidId,
            Self::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Self::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            Self::ZeroSized { .. } => ErrorKind::ZeroSized,
            Self::TableCorruption { .. }
            | Self::ArenaBounds { .. }
            | Self::Io { .. }
            | Self::Config { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the collector must stop the process on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TableCorruption { .. } | Self::ArenaBounds { .. })
    }

    /// Shorthand for a corruption error.
    pub fn corruption(cause: impl Into<String>) -> Self {
        Self::TableCorruption {
            cause: cause.into(),
        }
    }
}

/// Result type for allocator operations.
pub type Result<T> = std::result::Result<T, HeapError>;
