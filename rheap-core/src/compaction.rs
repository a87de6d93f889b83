//! Arena compaction.
//!
//! Compaction slides every used block down so it immediately follows the
//! previous one, eliminating the holes left by free regions and the slack of
//! oversized blocks. Ids never change; only offsets move.

use crate::arena::Arena;
use crate::error::Result;
use crate::table::BlockTable;
use crate::types::BlockId;
use std::collections::HashMap;
use std::time::Duration;

/// When the collector is allowed to compact on its own.
#[derive(Debug, Clone)]
pub struct CompactionPolicy {
    /// Fragmentation percentage that must be exceeded.
    pub fragmentation_threshold: f64,
    /// Minimum time since the previous compaction.
    pub cooldown: Duration,
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        Self {
            fragmentation_threshold: 10.0,
            cooldown: Duration::from_secs(300),
        }
    }
}

impl CompactionPolicy {
    /// Whether a collector tick should compact.
    pub fn should_compact(&self, fragmentation_percentage: f64, since_last: Duration) -> bool {
        fragmentation_percentage > self.fragmentation_threshold && since_last >= self.cooldown
    }
}

/// A single block relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMove {
    /// The block being moved.
    pub id: BlockId,
    /// Current offset.
    pub from: usize,
    /// Destination offset.
    pub to: usize,
    /// Bytes to move.
    pub len: usize,
}

/// Plan for compacting a table.
#[derive(Debug)]
pub struct CompactionPlan {
    /// Moves in ascending offset order.
    moves: Vec<BlockMove>,
    /// Destination of every used block, moved or not.
    offsets: HashMap<BlockId, usize>,
    /// High-water mark after compaction.
    new_high_water: usize,
    /// Bytes below the old high-water mark that become free.
    bytes_reclaimed: usize,
}

impl CompactionPlan {
    /// Compute the packed layout for `table`.
    pub fn for_table(table: &BlockTable) -> Self {
        let mut moves = Vec::new();
        let mut offsets = HashMap::new();
        let mut cursor = 0usize;

        for block in table.entries().iter().filter(|b| b.is_used()) {
            if block.offset != cursor {
                moves.push(BlockMove {
                    id: block.id,
                    from: block.offset,
                    to: cursor,
                    len: block.size,
                });
            }
            offsets.insert(block.id, cursor);
            cursor += block.size;
        }

        Self {
            moves,
            offsets,
            new_high_water: cursor,
            bytes_reclaimed: table.high_water() - cursor,
        }
    }

    /// Planned moves.
    pub fn moves(&self) -> &[BlockMove] {
        &self.moves
    }

    /// High-water mark after compaction.
    pub fn new_high_water(&self) -> usize {
        self.new_high_water
    }

    /// Bytes that become contiguous free space.
    pub fn bytes_reclaimed(&self) -> usize {
        self.bytes_reclaimed
    }

    /// Whether compaction would change anything.
    pub fn is_noop(&self) -> bool {
        self.bytes_reclaimed == 0
    }
}

/// Outcome of a compaction pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompactionResult {
    /// Number of blocks that changed offset.
    pub blocks_moved: usize,
    /// Bytes returned to the contiguous tail.
    pub bytes_reclaimed: usize,
    /// High-water mark after compaction.
    pub new_high_water: usize,
}

/// Apply a plan to the arena and the table.
///
/// Moves run in ascending offset order; every destination lies at or below
/// its source and above all earlier destinations, so no unmoved data is
/// overwritten. The table is verified afterwards.
///
/// # Errors
/// Returns `ArenaBounds` or `TableCorruption` if the table disagrees with the
/// arena. Both are fatal for the caller.
pub fn execute(
    plan: CompactionPlan,
    table: &mut BlockTable,
    arena: &mut Arena,
) -> Result<CompactionResult> {
    for mv in &plan.moves {
        arena.move_within(mv.from, mv.to, mv.len)?;
    }

    table.apply_compaction(&plan.offsets);
    table.check_invariants()?;

    Ok(CompactionResult {
        blocks_moved: plan.moves.len(),
        bytes_reclaimed: plan.bytes_reclaimed,
        new_high_water: plan.new_high_water,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementType;

    #[test]
    fn policy_requires_threshold_and_cooldown() {
        let policy = CompactionPolicy::default();
        assert!(!policy.should_compact(10.0, Duration::from_secs(600)));
        assert!(!policy.should_compact(50.0, Duration::from_secs(10)));
        assert!(policy.should_compact(10.5, Duration::from_secs(300)));
    }

    #[test]
    fn plan_packs_used_blocks() {
        let mut table = BlockTable::new(0x400);
        let a = table.place(ElementType::Byte, 64).unwrap();
        let b = table.place(ElementType::Byte, 64).unwrap();
        let c = table.place(ElementType::Byte, 64).unwrap();
        table.decrease_ref_count(b.id).unwrap();
        table.sweep();

        let plan = CompactionPlan::for_table(&table);
        assert_eq!(plan.moves().len(), 1);
        assert_eq!(
            plan.moves()[0],
            BlockMove {
                id: c.id,
                from: 128,
                to: 64,
                len: 64
            }
        );
        assert_eq!(plan.new_high_water(), 128);
        assert_eq!(plan.bytes_reclaimed(), 64);
        assert_eq!(plan.offsets[&a.id], 0);
    }

    #[test]
    fn execute_moves_data() {
        let mut arena = Arena::new(0x40).unwrap();
        let mut table = BlockTable::new(0x40);

        let a = table.place(ElementType::Byte, 8).unwrap();
        arena.write(a.offset, b"AAAAAAAA").unwrap();
        let b = table.place(ElementType::Byte, 8).unwrap();
        arena.write(b.offset, b"BBBBBBBB").unwrap();
        let c = table.place(ElementType::Byte, 8).unwrap();
        arena.write(c.offset, b"CCCCCCCC").unwrap();

        table.decrease_ref_count(a.id).unwrap();
        table.sweep();

        let plan = CompactionPlan::for_table(&table);
        let result = execute(plan, &mut table, &mut arena).unwrap();

        assert_eq!(result.blocks_moved, 2);
        assert_eq!(result.bytes_reclaimed, 8);
        assert_eq!(result.new_high_water, 16);
        assert_eq!(table.get(b.id).unwrap().offset, 0);
        assert_eq!(table.get(c.id).unwrap().offset, 8);
        assert_eq!(arena.read(0, 8).unwrap(), b"BBBBBBBB");
        assert_eq!(arena.read(8, 8).unwrap(), b"CCCCCCCC");
        assert_eq!(table.high_water(), 16);
    }

    #[test]
    fn oversized_slack_is_trimmed() {
        let mut arena = Arena::new(32).unwrap();
        let mut table = BlockTable::new(32);

        let a = table.place(ElementType::Byte, 16).unwrap();
        let _b = table.place(ElementType::Byte, 4).unwrap();
        table.decrease_ref_count(a.id).unwrap();
        table.sweep();
        let c = table.place(ElementType::Byte, 4).unwrap();
        assert_eq!(table.get(c.id).unwrap().capacity, 16);

        let plan = CompactionPlan::for_table(&table);
        assert!(!plan.is_noop());
        execute(plan, &mut table, &mut arena).unwrap();

        assert_eq!(table.get(c.id).unwrap().capacity, 4);
        assert_eq!(table.high_water(), 8);
        assert_eq!(table.gap_bytes(), 0);
    }
}
