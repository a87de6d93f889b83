//! Remote heap core library
//!
//! This crate holds the server side of the remote heap: a fixed-size byte
//! arena, the block table that carves it up, reference counting, the
//! background collector and compaction, plus the wire protocol shared with
//! clients.
//!
//! # Key Components
//!
//! - **Allocator**: arena and block table behind one lock
//! - **Collector**: periodic sweep of unreferenced blocks and compaction
//! - **Protocol**: request/response messages and their dispatch onto a
//!   [`HeapService`]
//!
//! # Example
//!
//! ```
//! use rheap_core::prelude::*;
//!
//! let heap = Allocator::new(HeapConfig::new(64)).unwrap();
//! let id = heap.create(ElementType::Int32, 1).unwrap();
//! heap.set(id, &42i32.to_le_bytes()).unwrap();
//! assert_eq!(heap.get(id).unwrap(), 42i32.to_le_bytes());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod arena;
pub mod collector;
pub mod compaction;
pub mod config;
pub mod dump;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod service;
pub mod table;
pub mod types;

pub use allocator::{Allocator, CollectionReport, HeapStats};
pub use collector::Collector;
pub use config::HeapConfig;
pub use dump::HeapSnapshot;
pub use error::{HeapError, Result};
pub use service::HeapService;
pub use types::{BlockId, ElementType};
