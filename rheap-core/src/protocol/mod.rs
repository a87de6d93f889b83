//! Wire protocol between handles and the allocator.
//!
//! The protocol has five operations:
//!
//! | Operation        | Request             | Response             |
//! |------------------|---------------------|----------------------|
//! | Create           | [`CreateRequest`]   | [`CreateResponse`]   |
//! | Set              | [`SetRequest`]      | [`SetResponse`]      |
//! | Get              | [`GetRequest`]      | [`GetResponse`]      |
//! | IncreaseRefCount | [`RefCountRequest`] | [`RefCountResponse`] |
//! | DecreaseRefCount | [`RefCountRequest`] | [`RefCountResponse`] |
//!
//! There is no delete: a block is reclaimed only after its count reaches
//! zero and the collector sweeps it.

pub mod dispatch;
mod messages;

pub use messages::{
    CreateRequest, CreateResponse, ErrorKind, GetRequest, GetResponse, RefCountRequest,
    RefCountResponse, Reply, SetRequest, SetResponse,
};
