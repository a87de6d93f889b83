//! Request and response schemas.
//!
//! Every response carries `success`; on failure `error_kind` and
//! `error_message` describe what went wrong. Server-side errors always travel
//! in-band so a well-formed request gets a diagnosable answer.

use crate::error::HeapError;
use crate::types::{BlockId, ElementType};
use serde::{Deserialize, Serialize};

/// Failure categories visible to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No space for the request.
    OutOfMemory,
    /// Unknown or freed block id.
    InvalidId,
    /// Write larger than the block.
    SizeMismatch,
    /// Unknown element type.
    UnsupportedType,
    /// Request for zero bytes.
    ZeroSized,
    /// Server-side fault unrelated to the request.
    Internal,
}

/// Create a block of `element_count` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Type name (`int32`, `float32`, `float64`, `byte`, `bool`, `opaque`).
    pub element_type: String,
    /// Element width for `opaque`, ignored otherwise.
    #[serde(default)]
    pub opaque_width: u32,
    /// Number of elements.
    pub element_count: u64,
}

impl CreateRequest {
    /// Request `count` elements of `element_type`.
    pub fn new(element_type: ElementType, count: u64) -> Self {
        Self {
            element_type: element_type.name().to_string(),
            opaque_width: element_type.opaque_width(),
            element_count: count,
        }
    }
}

/// Reply to [`CreateRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResponse {
    /// Whether the block was created.
    pub success: bool,
    /// The new id, null on failure.
    #[serde(default)]
    pub id: BlockId,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Failure description.
    #[serde(default)]
    pub error_message: String,
}

/// Overwrite the start of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequest {
    /// Target block.
    pub id: BlockId,
    /// Bytes to write from the block's start.
    pub payload: Vec<u8>,
}

/// Reply to [`SetRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResponse {
    /// Whether the write happened.
    pub success: bool,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Failure description.
    #[serde(default)]
    pub error_message: String,
}

/// Read a whole block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Source block.
    pub id: BlockId,
}

/// Reply to [`GetRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    /// Whether the read happened.
    pub success: bool,
    /// Copy of the block's bytes.
    #[serde(default)]
    pub payload: Vec<u8>,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Failure description.
    #[serde(default)]
    pub error_message: String,
}

/// Increase or decrease a block's reference count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCountRequest {
    /// Target block.
    pub id: BlockId,
}

/// Reply to [`RefCountRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCountResponse {
    /// Whether the count changed (or was already zero).
    pub success: bool,
    /// Count after the operation.
    #[serde(default)]
    pub refcount: u32,
    /// Failure category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Failure description.
    #[serde(default)]
    pub error_message: String,
}

/// Common access to the failure fields of every response.
pub trait Reply {
    /// Whether the call succeeded.
    fn success(&self) -> bool;
    /// Failure category, if any.
    fn error_kind(&self) -> Option<ErrorKind>;
    /// Failure description.
    fn error_message(&self) -> &str;
}

macro_rules! impl_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reply for $ty {
                fn success(&self) -> bool {
                    self.success
                }

                fn error_kind(&self) -> Option<ErrorKind> {
                    self.error_kind
                }

                fn error_message(&self) -> &str {
                    &self.error_message
                }
            }
        )*
    };
}

impl_reply!(CreateResponse, SetResponse, GetResponse, RefCountResponse);

impl CreateResponse {
    /// Successful creation.
    pub fn ok(id: BlockId) -> Self {
        Self {
            success: true,
            id,
            error_kind: None,
            error_message: String::new(),
        }
    }

    /// Failed creation.
    pub fn failed(err: &HeapError) -> Self {
        Self {
            success: false,
            id: BlockId::NULL,
            error_kind: Some(err.kind()),
            error_message: err.to_string(),
        }
    }
}

impl SetResponse {
    /// Successful write.
    pub fn ok() -> Self {
        Self {
            success: true,
            error_kind: None,
            error_message: String::new(),
        }
    }

    /// Failed write.
    pub fn failed(err: &HeapError) -> Self {
        Self {
            success: false,
            error_kind: Some(err.kind()),
            error_message: err.to_string(),
        }
    }
}

impl GetResponse {
    /// Successful read.
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            success: true,
            payload,
            error_kind: None,
            error_message: String::new(),
        }
    }

    /// Failed read.
    pub fn failed(err: &HeapError) -> Self {
        Self {
            success: false,
            payload: Vec::new(),
            error_kind: Some(err.kind()),
            error_message: err.to_string(),
        }
    }
}

impl RefCountResponse {
    /// Successful count change.
    pub fn ok(refcount: u32) -> Self {
        Self {
            success: true,
            refcount,
            error_kind: None,
            error_message: String::new(),
        }
    }

    /// Failed count change.
    pub fn failed(err: &HeapError) -> Self {
        Self {
            success: false,
            refcount: 0,
            error_kind: Some(err.kind()),
            error_message: err.to_string(),
        }
    }
}
