//! The server-side allocator.
//!
//! One [`Allocator`] owns the arena and the block table behind a single
//! mutex. Every request handler and the collector go through it, so each
//! operation observes the table in a consistent state and no reader ever
//! sees a block half-moved by compaction.

use crate::arena::Arena;
use crate::compaction::{self, CompactionPlan, CompactionPolicy, CompactionResult};
use crate::config::HeapConfig;
use crate::dump::{DumpWriter, HeapSnapshot};
use crate::error::{HeapError, Result};
use crate::service::HeapService;
use crate::table::{Block, BlockTable};
use crate::types::{BlockId, ElementType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Usage counters reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapStats {
    /// Arena size in bytes.
    pub total_size: usize,
    /// Sum of used block sizes.
    pub used_bytes: usize,
    /// Bytes not held by used blocks.
    pub free_bytes: usize,
    /// End of the last table entry.
    pub high_water: usize,
    /// Free bytes below the high-water mark.
    pub gap_bytes: usize,
    /// Gap bytes as a percentage of free bytes.
    pub fragmentation_percentage: f64,
    /// Live blocks.
    pub used_blocks: usize,
    /// Free entries still in the table.
    pub free_entries: usize,
    /// Used blocks with a zero refcount.
    pub pending_sweep: usize,
    /// Id the next allocation receives.
    pub next_id: BlockId,
    /// Compactions since start.
    pub compactions: u64,
    /// Seconds since the last compaction, or since start.
    pub seconds_since_compaction: u64,
}

/// What one collector tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionReport {
    /// Blocks turned free by the sweep.
    pub swept: Vec<BlockId>,
    /// Table entries removed by merging free regions.
    pub entries_merged: usize,
    /// Compaction outcome, if the policy triggered one.
    pub compaction: Option<CompactionResult>,
}

impl CollectionReport {
    /// Whether the tick changed nothing.
    pub fn is_idle(&self) -> bool {
        self.swept.is_empty() && self.entries_merged == 0 && self.compaction.is_none()
    }
}

struct HeapState {
    arena: Arena,
    table: BlockTable,
    last_compaction: Instant,
    compactions: u64,
}

impl HeapState {
    fn compact(&mut self) -> Result<CompactionResult> {
        let plan = CompactionPlan::for_table(&self.table);
        let result = compaction::execute(plan, &mut self.table, &mut self.arena)?;
        self.last_compaction = Instant::now();
        self.compactions += 1;
        Ok(result)
    }

    fn stats(&self) -> HeapStats {
        let entries = self.table.entries();
        let used_blocks = entries.iter().filter(|b| b.is_used()).count();
        HeapStats {
            total_size: self.table.total_size(),
            used_bytes: self.table.used_bytes(),
            free_bytes: self.table.free_bytes(),
            high_water: self.table.high_water(),
            gap_bytes: self.table.gap_bytes(),
            fragmentation_percentage: self.table.fragmentation_percentage(),
            used_blocks,
            free_entries: entries.len() - used_blocks,
            pending_sweep: entries.iter().filter(|b| b.is_pending_sweep()).count(),
            next_id: self.table.next_id(),
            compactions: self.compactions,
            seconds_since_compaction: self.last_compaction.elapsed().as_secs(),
        }
    }
}

/// Arena, block table and compaction policy for one heap.
pub struct Allocator {
    state: Mutex<HeapState>,
    policy: CompactionPolicy,
    config: HeapConfig,
    dumps: Option<DumpWriter>,
}

impl Allocator {
    /// Build an allocator from a validated configuration.
    ///
    /// # Errors
    /// `Config` for invalid settings, `Io` if the dump directory cannot be
    /// created.
    pub fn new(config: HeapConfig) -> Result<Self> {
        config.validate()?;

        let dumps = config
            .dump_dir
            .as_ref()
            .map(|dir| DumpWriter::new(dir.clone()))
            .transpose()?;
        let policy = CompactionPolicy {
            fragmentation_threshold: config.fragmentation_threshold,
            cooldown: config.compaction_cooldown,
        };

        tracing::info!(
            arena_size = config.arena_size,
            fragmentation_threshold = config.fragmentation_threshold,
            cooldown_secs = config.compaction_cooldown.as_secs(),
            dumps = dumps.is_some(),
            "Heap allocator ready"
        );

        let arena = Arena::new(config.arena_size)?;

        Ok(Self {
            state: Mutex::new(HeapState {
                arena,
                table: BlockTable::new(config.arena_size),
                last_compaction: Instant::now(),
                compactions: 0,
            }),
            policy,
            config,
            dumps,
        })
    }

    /// The configuration this allocator was built with.
    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    /// Time between collector ticks.
    pub fn collector_interval(&self) -> Duration {
        self.config.collector_interval
    }

    /// Copy of a used block's descriptor.
    pub fn block(&self, id: BlockId) -> Result<Block> {
        self.state.lock().table.get(id).cloned()
    }

    /// Run one collection: sweep unreferenced blocks, merge free regions,
    /// then compact if the policy allows.
    ///
    /// # Errors
    /// `TableCorruption` or `ArenaBounds`; both are fatal.
    pub fn collect(&self) -> Result<CollectionReport> {
        let mut state = self.state.lock();

        let swept = state.table.sweep();
        let entries_merged = state.table.merge_free();
        state.table.check_invariants()?;

        let fragmentation = state.table.fragmentation_percentage();
        let compaction = if self
            .policy
            .should_compact(fragmentation, state.last_compaction.elapsed())
        {
            Some(state.compact()?)
        } else {
            None
        };

        let report = CollectionReport {
            swept,
            entries_merged,
            compaction,
        };
        if report.is_idle() {
            return Ok(report);
        }

        if !report.swept.is_empty() {
            tracing::info!(
                count = report.swept.len(),
                merged = report.entries_merged,
                used_bytes = state.table.used_bytes(),
                "Swept unreferenced blocks"
            );
        }
        if let Some(result) = &report.compaction {
            tracing::info!(
                fragmentation,
                moved = result.blocks_moved,
                reclaimed = result.bytes_reclaimed,
                high_water = result.new_high_water,
                "Compacted arena"
            );
        }

        let snapshot = self.capture(&state.table);
        drop(state);
        self.write_dump(snapshot);
        Ok(report)
    }

    /// Compact now, ignoring the policy.
    pub fn compact(&self) -> Result<CompactionResult> {
        let mut state = self.state.lock();
        let result = state.compact()?;
        tracing::info!(
            moved = result.blocks_moved,
            reclaimed = result.bytes_reclaimed,
            "Compacted arena on request"
        );
        let snapshot = self.capture(&state.table);
        drop(state);
        self.write_dump(snapshot);
        Ok(result)
    }

    fn capture(&self, table: &BlockTable) -> Option<HeapSnapshot> {
        self.dumps.as_ref().map(|writer| writer.capture(table))
    }

    fn write_dump(&self, snapshot: Option<HeapSnapshot>) {
        let (Some(writer), Some(snapshot)) = (&self.dumps, snapshot) else {
            return;
        };
        if let Err(e) = writer.write(&snapshot) {
            tracing::warn!(error = %e, "Failed to write heap dump");
        }
    }
}

impl HeapService for Allocator {
    fn create(&self, element_type: ElementType, count: u64) -> Result<BlockId> {
        let mut state = self.state.lock();
        let size = state.table.requested_size(element_type, count)?;

        let placement = match state.table.place(element_type, size) {
            Some(placement) => placement,
            None if state.table.free_bytes() >= size => {
                let result = state.compact()?;
                tracing::info!(
                    requested = size,
                    reclaimed = result.bytes_reclaimed,
                    "Compacted to satisfy allocation"
                );
                state.table.place(element_type, size).ok_or_else(|| {
                    HeapError::corruption(format!(
                        "{size} bytes free after compaction but placement failed"
                    ))
                })?
            }
            None => return Err(state.table.out_of_memory(size)),
        };
        state.arena.zero(placement.offset, placement.size)?;

        tracing::debug!(
            id = %placement.id,
            element_type = %element_type,
            size = placement.size,
            offset = placement.offset,
            reused = placement.reused,
            "Block created"
        );

        let snapshot = self.capture(&state.table);
        drop(state);
        self.write_dump(snapshot);
        Ok(placement.id)
    }

    fn set(&self, id: BlockId, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let block = state.table.get(id)?;
        if bytes.len() > block.size {
            return Err(HeapError::SizeMismatch {
                id,
                written: bytes.len() as u64,
                size: block.size as u64,
            });
        }
        let offset = block.offset;
        state.arena.write(offset, bytes)?;

        let snapshot = self.capture(&state.table);
        drop(state);
        self.write_dump(snapshot);
        Ok(())
    }

    fn get(&self, id: BlockId) -> Result<Vec<u8>> {
        let state = self.state.lock();
        let block = state.table.get(id)?;
        Ok(state.arena.read(block.offset, block.size)?.to_vec())
    }

    fn increase_ref_count(&self, id: BlockId) -> Result<u32> {
        let mut state = self.state.lock();
        let count = state.table.increase_ref_count(id)?;
        tracing::trace!(id = %id, refcount = count, "Reference added");

        let snapshot = self.capture(&state.table);
        drop(state);
        self.write_dump(snapshot);
        Ok(count)
    }

    fn decrease_ref_count(&self, id: BlockId) -> Result<u32> {
        let mut state = self.state.lock();
        let (count, floored) = state.table.decrease_ref_count(id)?;
        if floored {
            tracing::warn!(id = %id, "Reference count already zero");
        } else {
            tracing::trace!(id = %id, refcount = count, "Reference dropped");
        }

        let snapshot = self.capture(&state.table);
        drop(state);
        self.write_dump(snapshot);
        Ok(count)
    }

    fn stats(&self) -> HeapStats {
        self.state.lock().stats()
    }

    fn snapshot(&self) -> HeapSnapshot {
        HeapSnapshot::capture(&self.state.lock().table)
    }
}

impl std::fmt::Debug for Allocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocator")
            .field("arena_size", &self.config.arena_size)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
