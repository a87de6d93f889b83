//! Diagnostic snapshots of the heap.
//!
//! A snapshot is taken under the allocator lock and written to disk after
//! the lock is released. Dumps are for humans debugging a server; nothing
//! reads them back.

use crate::error::{HeapError, Result};
use crate::table::{Block, BlockState, BlockTable};
use crate::types::{BlockId, ElementType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// One table entry as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    /// Block id.
    pub id: BlockId,
    /// Element type.
    pub element_type: ElementType,
    /// Logical size.
    pub size: usize,
    /// Reserved bytes.
    pub capacity: usize,
    /// Offset in the arena.
    pub offset: usize,
    /// Outstanding references.
    pub refcount: u32,
    /// Whether the block is used.
    pub used: bool,
}

impl From<&Block> for BlockSnapshot {
    fn from(block: &Block) -> Self {
        Self {
            id: block.id,
            element_type: block.element_type,
            size: block.size,
            capacity: block.capacity,
            offset: block.offset,
            refcount: block.refcount,
            used: block.state == BlockState::Used,
        }
    }
}

/// Point-in-time view of the whole heap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeapSnapshot {
    /// Position in the dump sequence; 0 for snapshots not taken for a dump.
    #[serde(default)]
    pub seq: u64,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Arena size.
    pub total_size: usize,
    /// Sum of used block sizes.
    pub used_size: usize,
    /// High-water mark.
    pub high_water: usize,
    /// Entries in offset order.
    pub blocks: Vec<BlockSnapshot>,
}

impl HeapSnapshot {
    /// Capture the table.
    pub fn capture(table: &BlockTable) -> Self {
        Self {
            seq: 0,
            taken_at: Utc::now(),
            total_size: table.total_size(),
            used_size: table.used_bytes(),
            high_water: table.high_water(),
            blocks: table.entries().iter().map(BlockSnapshot::from).collect(),
        }
    }
}

/// Writes snapshots as pretty JSON files into a directory.
#[derive(Debug)]
pub struct DumpWriter {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl DumpWriter {
    /// Create the writer, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| HeapError::Io {
            path: dir.clone(),
            cause: e.to_string(),
        })?;
        Ok(Self {
            dir,
            sequence: AtomicU64::new(1),
        })
    }

    /// Capture `table` and give the snapshot the next sequence number.
    ///
    /// Call this while holding the lock that guards `table`, so that
    /// sequence order is mutation order.
    pub fn capture(&self, table: &BlockTable) -> HeapSnapshot {
        HeapSnapshot {
            seq: self.sequence.fetch_add(1, Ordering::Relaxed),
            ..HeapSnapshot::capture(table)
        }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one snapshot; returns the file path.
    pub fn write(&self, snapshot: &HeapSnapshot) -> Result<PathBuf> {
        let name = format!(
            "dump_{:06}_{}.json",
            snapshot.seq,
            snapshot.taken_at.format("%Y%m%d_%H%M%S_%3f")
        );
        let path = self.dir.join(name);

        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| HeapError::Io {
            path: path.clone(),
            cause: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| HeapError::Io {
            path: path.clone(),
            cause: e.to_string(),
        })?;
        Ok(path)
    }
}
