//! Block descriptors and the placement policy.
//!
//! The table keeps every entry, used or free, ordered by offset. Entries tile
//! `[0, high_water)` with no holes: a block reusing a free region keeps the
//! whole region as its capacity, so the tiling survives first-fit reuse
//! without splitting.
//!
//! ```text
//! 0                                              high_water      total_size
//! ├──────────┬──────────────┬───────┬───────────────┤─────────────────┤
//! │ Used #1  │ Free (old #2)│Used #4│ Used #3 (+slack)│   untouched     │
//! └──────────┴──────────────┴───────┴───────────────┴─────────────────┘
//! ```

use crate::error::{HeapError, Result};
use crate::types::{BlockId, ElementType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Externally observable state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockState {
    /// Holds live data.
    Used,
    /// Reclaimed; its region can be reused.
    Free,
}

/// Descriptor of one region of the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block id. A free entry keeps the id it had while used.
    pub id: BlockId,
    /// Start of the block in the arena.
    pub offset: usize,
    /// Logical size: the window `Get` returns and `Set` may fill.
    pub size: usize,
    /// Bytes reserved in the arena, at least `size`.
    pub capacity: usize,
    /// Element type the block was created with.
    pub element_type: ElementType,
    /// Outstanding references.
    pub refcount: u32,
    /// Used or free.
    pub state: BlockState,
}

impl Block {
    /// End of the reserved region.
    pub fn end(&self) -> usize {
        self.offset + self.capacity
    }

    /// Whether the block holds live data.
    pub fn is_used(&self) -> bool {
        self.state == BlockState::Used
    }

    /// Used, but no longer referenced and waiting for the next sweep.
    pub fn is_pending_sweep(&self) -> bool {
        self.is_used() && self.refcount == 0
    }
}

/// Where a new block was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// The new id.
    pub id: BlockId,
    /// Offset of the block.
    pub offset: usize,
    /// Logical size.
    pub size: usize,
    /// Whether a free region was reused (first-fit) rather than bumped.
    pub reused: bool,
}

/// The set of block descriptors for one arena.
#[derive(Debug)]
pub struct BlockTable {
    /// All entries ordered by offset.
    entries: Vec<Block>,
    /// Position of each id in `entries`.
    index: HashMap<BlockId, usize>,
    /// Next id to hand out.
    next_id: u64,
    /// Sum of the sizes of used blocks.
    used_bytes: usize,
    /// Arena size.
    total_size: usize,
}

impl BlockTable {
    /// Create an empty table for an arena of `total_size` bytes.
    pub fn new(total_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            used_bytes: 0,
            total_size,
        }
    }

    /// Arena size this table manages.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// End of the last entry; bump allocations start here.
    pub fn high_water(&self) -> usize {
        self.entries.last().map(Block::end).unwrap_or(0)
    }

    /// Sum of the sizes of used blocks.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Bytes not held by used blocks.
    pub fn free_bytes(&self) -> usize {
        self.total_size - self.used_bytes
    }

    /// Bytes below the high-water mark not holding live data.
    pub fn gap_bytes(&self) -> usize {
        self.high_water() - self.used_bytes
    }

    /// Gap bytes as a percentage of free bytes.
    pub fn fragmentation_percentage(&self) -> f64 {
        let free = self.free_bytes();
        if free == 0 {
            return 0.0;
        }
        self.gap_bytes() as f64 / free as f64 * 100.0
    }

    /// The id the next allocation will receive.
    pub fn next_id(&self) -> BlockId {
        BlockId::new(self.next_id)
    }

    /// All entries in offset order.
    pub fn entries(&self) -> &[Block] {
        &self.entries
    }

    /// Number of entries (used and free).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a used block.
    pub fn get(&self, id: BlockId) -> Result<&Block> {
        self.index
            .get(&id)
            .map(|&pos| &self.entries[pos])
            .filter(|block| block.is_used())
            .ok_or(HeapError::InvalidId { id })
    }

    fn get_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        match self.index.get(&id) {
            Some(&pos) if self.entries[pos].is_used() => Ok(&mut self.entries[pos]),
            _ => Err(HeapError::InvalidId { id }),
        }
    }

    /// Bytes needed for `count` elements of `element_type`.
    ///
    /// # Errors
    /// `ZeroSized` for an empty request, `OutOfMemory` if the byte count
    /// overflows.
    pub fn requested_size(&self, element_type: ElementType, count: u64) -> Result<usize> {
        let bytes = (element_type.size() as u64)
            .checked_mul(count)
            .and_then(|bytes| usize::try_from(bytes).ok());
        match bytes {
            Some(0) => Err(HeapError::ZeroSized {
                element_type: element_type.to_string(),
                count,
            }),
            Some(bytes) => Ok(bytes),
            None => Err(HeapError::OutOfMemory {
                requested: u64::MAX,
                available: self.free_bytes() as u64,
                total_size: self.total_size as u64,
            }),
        }
    }

    /// The error for a request of `requested` bytes that cannot be placed.
    pub fn out_of_memory(&self, requested: usize) -> HeapError {
        HeapError::OutOfMemory {
            requested: requested as u64,
            available: self.free_bytes() as u64,
            total_size: self.total_size as u64,
        }
    }

    /// Place a block of `size` bytes: first fit among free entries in offset
    /// order, otherwise at the high-water mark.
    ///
    /// Returns `None` when neither fits; the caller decides whether to
    /// compact and retry.
    pub fn place(&mut self, element_type: ElementType, size: usize) -> Option<Placement> {
        let id = BlockId::new(self.next_id);

        if let Some(pos) = self
            .entries
            .iter()
            .position(|b| b.state == BlockState::Free && b.capacity >= size)
        {
            let entry = &mut self.entries[pos];
            let old_id = entry.id;
            entry.id = id;
            entry.size = size;
            entry.element_type = element_type;
            entry.refcount = 1;
            entry.state = BlockState::Used;
            let offset = entry.offset;

            self.index.remove(&old_id);
            self.index.insert(id, pos);
            self.next_id += 1;
            self.used_bytes += size;
            return Some(Placement {
                id,
                offset,
                size,
                reused: true,
            });
        }

        let offset = self.high_water();
        if size > self.total_size - offset {
            return None;
        }

        self.entries.push(Block {
            id,
            offset,
            size,
            capacity: size,
            element_type,
            refcount: 1,
            state: BlockState::Used,
        });
        self.index.insert(id, self.entries.len() - 1);
        self.next_id += 1;
        self.used_bytes += size;
        Some(Placement {
            id,
            offset,
            size,
            reused: false,
        })
    }

    /// Add one reference; saturates at `u32::MAX`.
    pub fn increase_ref_count(&mut self, id: BlockId) -> Result<u32> {
        let block = self.get_mut(id)?;
        block.refcount = block.refcount.saturating_add(1);
        Ok(block.refcount)
    }

    /// Drop one reference; floors at zero.
    ///
    /// Returns the new count and whether the call was a no-op at zero.
    pub fn decrease_ref_count(&mut self, id: BlockId) -> Result<(u32, bool)> {
        let block = self.get_mut(id)?;
        if block.refcount == 0 {
            return Ok((0, true));
        }
        block.refcount -= 1;
        Ok((block.refcount, false))
    }

    /// Turn every unreferenced used block free. Returns the swept ids.
    pub fn sweep(&mut self) -> Vec<BlockId> {
        let mut swept = Vec::new();
        for block in self.entries.iter_mut().filter(|b| b.is_pending_sweep()) {
            block.state = BlockState::Free;
            self.used_bytes -= block.size;
            block.size = block.capacity;
            swept.push(block.id);
        }
        swept
    }

    /// Coalesce byte-adjacent free entries and drop a trailing free entry,
    /// lowering the high-water mark. Returns the number of entries removed.
    pub fn merge_free(&mut self) -> usize {
        let before = self.entries.len();
        let mut merged: Vec<Block> = Vec::with_capacity(before);

        for block in self.entries.drain(..) {
            match merged.last_mut() {
                Some(prev)
                    if prev.state == BlockState::Free
                        && block.state == BlockState::Free
                        && prev.end() == block.offset =>
                {
                    prev.capacity += block.capacity;
                    prev.size = prev.capacity;
                }
                _ => merged.push(block),
            }
        }

        if merged.last().is_some_and(|b| b.state == BlockState::Free) {
            merged.pop();
        }

        self.entries = merged;
        self.rebuild_index();
        before - self.entries.len()
    }

    /// Replace the layout after compaction: only used blocks remain, packed
    /// from offset zero, with capacity trimmed to size.
    pub(crate) fn apply_compaction(&mut self, new_offsets: &HashMap<BlockId, usize>) {
        self.entries.retain(|b| b.is_used());
        for block in &mut self.entries {
            if let Some(&offset) = new_offsets.get(&block.id) {
                block.offset = offset;
            }
            block.capacity = block.size;
        }
        self.entries.sort_by_key(|b| b.offset);
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, block)| (block.id, pos))
            .collect();
    }

    /// Verify the table invariants.
    ///
    /// # Errors
    /// Returns `TableCorruption` describing the first violation found.
    pub fn check_invariants(&self) -> Result<()> {
        let mut expected_offset = 0usize;
        let mut used = 0usize;
        let mut seen = HashSet::with_capacity(self.entries.len());

        for (pos, block) in self.entries.iter().enumerate() {
            if block.offset != expected_offset {
                return Err(HeapError::corruption(format!(
                    "{} starts at {} but previous entry ends at {}",
                    block.id, block.offset, expected_offset
                )));
            }
            if block.capacity < block.size {
                return Err(HeapError::corruption(format!(
                    "{} has size {} above capacity {}",
                    block.id, block.size, block.capacity
                )));
            }
            if block.state == BlockState::Free && block.refcount != 0 {
                return Err(HeapError::corruption(format!(
                    "free {} has refcount {}",
                    block.id, block.refcount
                )));
            }
            if block.id.is_null() || block.id.as_u64() >= self.next_id {
                return Err(HeapError::corruption(format!(
                    "{} outside assigned range",
                    block.id
                )));
            }
            if !seen.insert(block.id) {
                return Err(HeapError::corruption(format!("{} appears twice", block.id)));
            }
            if self.index.get(&block.id) != Some(&pos) {
                return Err(HeapError::corruption(format!(
                    "index out of date for {}",
                    block.id
                )));
            }
            if block.is_used() {
                used += block.size;
            }
            expected_offset = block.end();
        }

        if expected_offset > self.total_size {
            return Err(HeapError::corruption(format!(
                "high-water mark {} beyond arena size {}",
                expected_offset, self.total_size
            )));
        }
        if used != self.used_bytes {
            return Err(HeapError::corruption(format!(
                "used bytes {} but blocks hold {}",
                self.used_bytes, used
            )));
        }
        if self.index.len() != self.entries.len() {
            return Err(HeapError::corruption("index holds stale ids"));
        }
        Ok(())
    }
}
