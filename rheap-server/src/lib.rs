//! Remote heap server
//!
//! Serves the heap protocol over HTTP on top of a shared
//! [`Allocator`](rheap_core::Allocator), and sets up logging for the
//! server process.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod observability;

pub use api::{ApiServer, ServerConfig};
