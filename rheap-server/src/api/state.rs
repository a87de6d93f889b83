//! Shared application state for API handlers.

use rheap_core::{Allocator, HeapService};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state passed to all handlers.
pub struct AppState {
    /// The heap being served.
    pub allocator: Arc<Allocator>,
    /// Server start time.
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state.
    pub fn new(allocator: Arc<Allocator>) -> Self {
        Self {
            allocator,
            start_time: Instant::now(),
        }
    }

    /// The heap as a protocol service.
    pub fn service(&self) -> &dyn HeapService {
        self.allocator.as_ref()
    }

    /// Get server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
