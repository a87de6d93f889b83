//! Prelude for convenient imports.
//!
//! ```
//! use rheap_core::prelude::*;
//! ```

// Core types
pub use crate::types::{BlockId, ElementType};

// Error handling
pub use crate::error::{HeapError, Result};

// Allocator
pub use crate::allocator::{Allocator, CollectionReport, HeapStats};
pub use crate::collector::Collector;
pub use crate::config::HeapConfig;
pub use crate::service::HeapService;

// Protocol
pub use crate::protocol::{ErrorKind, Reply};
