//! HTTP API for the remote heap.
//!
//! Protocol operations are JSON `POST`s under `/api/v1`; failures of a
//! well-formed request are answered in-band with `200 OK`, so only transport
//! problems (unreadable or malformed bodies, unknown paths) use HTTP status
//! codes.
//!
//! # Architecture
//!
//! The API uses Hyper 1.x directly.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      ApiServer                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐   │
//! │  │   router     │──│   handlers   │──│    state     │   │
//! │  └──────────────┘  └──────────────┘  └──────────────┘   │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌──────────────────────────────────────────────────┐   │
//! │  │       protocol::dispatch → Allocator             │   │
//! │  └──────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rheap_core::{Allocator, HeapConfig};
//! use rheap_server::{ApiServer, ServerConfig};
//! use std::sync::Arc;
//!
//! let allocator = Arc::new(Allocator::new(HeapConfig::from_megabytes(16))?);
//! let mut server = ApiServer::new(ServerConfig::new("0.0.0.0", 50051), allocator);
//! server.bind().await?;
//! server.run_until(tokio::signal::ctrl_c().map(|_| ())).await?;
//! ```

mod error;
pub mod handlers;
mod request;
mod response;
mod router;
mod server;
mod state;

pub use error::ApiError;
pub use server::{ApiServer, ServerConfig};
pub use state::AppState;

/// Route prefix for all API endpoints.
pub const API_PREFIX: &str = "/api/v1";
