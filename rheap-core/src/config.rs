//! Allocator configuration.

use crate::error::{HeapError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Bytes in one megabyte, as used by the `--memsize` flag.
pub const MEGABYTE: usize = 1024 * 1024;

/// Configuration for an [`Allocator`](crate::Allocator).
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Total arena size in bytes.
    pub arena_size: usize,
    /// Interval between collector ticks.
    pub collector_interval: Duration,
    /// Fragmentation percentage above which the collector compacts.
    pub fragmentation_threshold: f64,
    /// Minimum time between two collector-driven compactions.
    pub compaction_cooldown: Duration,
    /// Directory for diagnostic dumps, if any.
    pub dump_dir: Option<PathBuf>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            arena_size: 16 * MEGABYTE,
            collector_interval: Duration::from_secs(1),
            fragmentation_threshold: 10.0,
            compaction_cooldown: Duration::from_secs(300),
            dump_dir: None,
        }
    }
}

impl HeapConfig {
    /// Configuration for an arena of `arena_size` bytes with default policy.
    pub fn new(arena_size: usize) -> Self {
        Self {
            arena_size,
            ..Self::default()
        }
    }

    /// Configuration for an arena of `megabytes` MB.
    pub fn from_megabytes(megabytes: usize) -> Self {
        Self::new(megabytes.saturating_mul(MEGABYTE))
    }

    /// Set the collector interval.
    pub fn with_collector_interval(mut self, interval: Duration) -> Self {
        self.collector_interval = interval;
        self
    }

    /// Set the fragmentation threshold (percent).
    pub fn with_fragmentation_threshold(mut self, percent: f64) -> Self {
        self.fragmentation_threshold = percent;
        self
    }

    /// Set the compaction cooldown.
    pub fn with_compaction_cooldown(mut self, cooldown: Duration) -> Self {
        self.compaction_cooldown = cooldown;
        self
    }

    /// Enable diagnostic dumps into `dir`.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Check the configuration.
    ///
    /// # Errors
    /// Returns `Config` for a zero arena, zero interval or a threshold
    /// outside `0..=100`.
    pub fn validate(&self) -> Result<()> {
        if self.arena_size == 0 {
            return Err(HeapError::Config {
                field: "arena_size".to_string(),
                cause: "must be greater than zero".to_string(),
            });
        }
        if self.collector_interval.is_zero() {
            return Err(HeapError::Config {
                field: "collector_interval".to_string(),
                cause: "must be greater than zero".to_string(),
            });
        }
        if !self.fragmentation_threshold.is_finite()
            || !(0.0..=100.0).contains(&self.fragmentation_threshold)
        {
            return Err(HeapError::Config {
                field: "fragmentation_threshold".to_string(),
                cause: format!(
                    "must be a percentage, got {}",
                    self.fragmentation_threshold
                ),
            });
        }
        Ok(())
    }
}
