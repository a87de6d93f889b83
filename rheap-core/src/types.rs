//! Strongly-typed identifiers and element type tags.

use crate::error::{HeapError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a block in the heap.
///
/// Ids are assigned from a monotonically increasing counter starting at 1 and
/// are never reused. `BlockId::NULL` (0) means "unbound".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockId(u64);

impl BlockId {
    /// The reserved null id.
    pub const NULL: BlockId = BlockId(0);

    /// Create a block id from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the null id.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

impl From<u64> for BlockId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Element type recorded on each block.
///
/// The element size is what `Create` multiplies the element count by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// 32-bit signed integer.
    Int32,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Single byte.
    Byte,
    /// Boolean stored as one byte.
    Bool,
    /// Caller-defined fixed-width payload.
    Opaque(u32),
}

impl ElementType {
    /// Size in bytes of one element.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
            Self::Byte | Self::Bool => 1,
            Self::Opaque(width) => *width as usize,
        }
    }

    /// Wire name of the type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Byte => "byte",
            Self::Bool => "bool",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Width carried next to the name on the wire (0 for primitives).
    #[must_use]
    pub const fn opaque_width(&self) -> u32 {
        match self {
            Self::Opaque(width) => *width,
            _ => 0,
        }
    }

    /// Parse a type tag received from a client.
    ///
    /// # Errors
    /// Returns `UnsupportedType` for unknown names.
    pub fn from_wire(name: &str, opaque_width: u32) -> Result<Self> {
        Ok(match name {
            "int32" => Self::Int32,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            "byte" => Self::Byte,
            "bool" => Self::Bool,
            "opaque" => Self::Opaque(opaque_width),
            other => {
                return Err(HeapError::UnsupportedType {
                    name: other.to_string(),
                });
            }
        })
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opaque(width) => write!(f, "opaque({})", width),
            other => f.write_str(other.name()),
        }
    }
}
