//! Client library for the remote heap.
//!
//! A [`HeapClient`] is built once at startup and shared by `Arc`. Each
//! [`RemoteHandle<T>`] wraps a block id on the server and turns the protocol
//! into pointer-like operations: `new`, `read`, `write`, `duplicate`,
//! `take`, and `release`. Reference counts follow the handles; the server's
//! collector reclaims a block once no handle refers to it.
//!
//! # Example
//!
//! ```no_run
//! use rheap_client::{HeapClient, RemoteHandle};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), rheap_client::ClientError> {
//! let client = Arc::new(HeapClient::connect(
//!     "http://localhost:50051",
//!     Duration::from_secs(5),
//! )?);
//!
//! let mut a = RemoteHandle::<f64>::null(&client);
//! a.write(&2.5).await?; // allocates on first write
//!
//! let b = a.duplicate().await?; // refcount 2
//! assert_eq!(b.read().await?, 2.5);
//!
//! b.release().await?;
//! a.release().await?; // refcount 0, reclaimed on the next collector tick
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Heap errors reported by the server keep their kind
//! ([`ClientError::OutOfMemory`], [`ClientError::InvalidId`], ...).
//! Transport failures surface as [`ClientError::ConnectionUnavailable`] or
//! [`ClientError::DeadlineExceeded`]. Dropping a handle never fails; a
//! release that cannot be delivered is logged.

#![warn(missing_docs)]

mod client;
mod codec;
mod error;
mod handle;
mod transport;

pub use client::HeapClient;
pub use codec::{RemoteValue, fixed};
pub use error::{ClientError, Result};
pub use handle::RemoteHandle;
pub use transport::{HttpTransport, LocalTransport, Transport, TransportFuture};

pub use rheap_core::{BlockId, ElementType};
