//! The operations a heap server exposes.

use crate::allocator::HeapStats;
use crate::dump::HeapSnapshot;
use crate::error::Result;
use crate::types::{BlockId, ElementType};

/// The protocol surface of a heap.
///
/// [`Allocator`](crate::Allocator) is the production implementation; the
/// protocol binding in [`crate::protocol::dispatch`] serves any
/// implementation, which keeps transports independent of the allocator.
pub trait HeapService: Send + Sync {
    /// Reserve a block of `count` elements; the block starts with refcount 1.
    fn create(&self, element_type: ElementType, count: u64) -> Result<BlockId>;

    /// Copy `bytes` into the start of the block.
    fn set(&self, id: BlockId, bytes: &[u8]) -> Result<()>;

    /// Copy out the whole block.
    fn get(&self, id: BlockId) -> Result<Vec<u8>>;

    /// Add a reference; returns the new count.
    fn increase_ref_count(&self, id: BlockId) -> Result<u32>;

    /// Drop a reference; returns the new count, never below zero.
    fn decrease_ref_count(&self, id: BlockId) -> Result<u32>;

    /// Current usage figures.
    fn stats(&self) -> HeapStats;

    /// Full table view.
    fn snapshot(&self) -> HeapSnapshot;
}
