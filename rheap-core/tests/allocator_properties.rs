//! Behavioural tests for the allocator and collector working together.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rheap_core::prelude::*;
use rheap_core::HeapSnapshot;

fn heap(size: usize) -> Allocator {
    Allocator::new(HeapConfig::new(size)).unwrap()
}

fn eager_heap(size: usize) -> Allocator {
    let config = HeapConfig::new(size)
        .with_compaction_cooldown(Duration::ZERO)
        .with_fragmentation_threshold(0.0);
    Allocator::new(config).unwrap()
}

fn assert_no_overlap(snapshot: &HeapSnapshot) {
    let mut used: Vec<_> = snapshot.blocks.iter().filter(|b| b.used).collect();
    used.sort_by_key(|b| b.offset);
    for pair in used.windows(2) {
        assert!(
            pair[0].offset + pair[0].size <= pair[1].offset,
            "{} overlaps {}",
            pair[0].id,
            pair[1].id
        );
    }
    let total: usize = used.iter().map(|b| b.size).sum();
    assert!(total <= snapshot.total_size);
}

#[test]
fn test_allocation_failure() {
    let heap = heap(16);
    let err = heap.create(ElementType::Byte, 20).unwrap_err();
    assert!(matches!(err, HeapError::OutOfMemory { requested: 20, .. }));
    assert_eq!(err.kind(), ErrorKind::OutOfMemory);
}

#[test]
fn test_write_bound() {
    let heap = heap(16);
    let id = heap.create(ElementType::Int32, 1).unwrap();
    let err = heap.set(id, &[0; 5]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeMismatch);
    assert_eq!(heap.get(id).unwrap(), vec![0; 4]);
}

#[test]
fn test_basic_round_trip() {
    let heap = heap(64);
    let id = heap.create(ElementType::Int32, 1).unwrap();
    assert_eq!(id, BlockId::new(1));

    heap.set(id, &42i32.to_le_bytes()).unwrap();
    let bytes: [u8; 4] = heap.get(id).unwrap().try_into().unwrap();
    assert_eq!(i32::from_le_bytes(bytes), 42);
}

#[test]
fn test_sweep_then_first_fit_reuse() {
    let heap = Arc::new(heap(256));
    for _ in 0..6 {
        heap.create(ElementType::Float64, 1).unwrap();
    }
    let seventh = heap.create(ElementType::Float64, 1).unwrap();
    heap.create(ElementType::Float64, 1).unwrap();
    assert_eq!(seventh, BlockId::new(7));
    let offset = heap.block(seventh).unwrap().offset;

    assert_eq!(heap.decrease_ref_count(seventh).unwrap(), 0);
    // Not freed until the collector runs.
    assert!(heap.get(seventh).is_ok());

    let report = Collector::new(heap.clone()).tick().unwrap();
    assert_eq!(report.swept, vec![seventh]);

    let reused = heap.create(ElementType::Int32, 1).unwrap();
    assert_ne!(reused, seventh);
    assert_eq!(heap.block(reused).unwrap().offset, offset);
    assert!(heap.get(seventh).is_err());
}

#[test]
fn test_refcount_floor() {
    let heap = Arc::new(heap(32));
    let id = heap.create(ElementType::Bool, 1).unwrap();

    assert_eq!(heap.decrease_ref_count(id).unwrap(), 0);
    assert_eq!(heap.decrease_ref_count(id).unwrap(), 0);
    assert_eq!(heap.get(id).unwrap(), vec![0]);

    Collector::new(heap.clone()).tick().unwrap();
    assert!(matches!(heap.get(id), Err(HeapError::InvalidId { .. })));
}

#[test]
fn test_copy_refcount_symmetry() {
    let heap = Arc::new(heap(32));
    let id = heap.create(ElementType::Int32, 1).unwrap();

    let copies = 5;
    for n in 0..copies {
        assert_eq!(heap.increase_ref_count(id).unwrap(), n + 2);
    }
    for _ in 0..copies {
        heap.decrease_ref_count(id).unwrap();
    }
    assert_eq!(heap.decrease_ref_count(id).unwrap(), 0);

    let report = Collector::new(heap.clone()).tick().unwrap();
    assert_eq!(report.swept, vec![id]);
    assert_eq!(heap.stats().used_blocks, 0);
}

#[test]
fn test_compaction_preserves_content_and_ids() {
    let heap = eager_heap(512);
    let mut live = Vec::new();
    for i in 0..16u8 {
        let id = heap.create(ElementType::Byte, 8 + i as u64).unwrap();
        heap.set(id, &vec![i; 8 + i as usize]).unwrap();
        if i % 3 == 0 {
            heap.decrease_ref_count(id).unwrap();
        } else {
            live.push((id, i));
        }
    }

    for _ in 0..3 {
        heap.collect().unwrap();
        for &(id, i) in &live {
            assert_eq!(heap.get(id).unwrap(), vec![i; 8 + i as usize]);
        }
        assert_no_overlap(&heap.snapshot());
    }

    let stats = heap.stats();
    assert_eq!(stats.gap_bytes, 0);
    assert_eq!(stats.high_water, stats.used_bytes);
    assert!(stats.compactions >= 1);
}

#[test]
fn test_concurrent_mutation_with_collection() {
    let heap = Arc::new(eager_heap(4096));
    let collector = Collector::new(heap.clone());

    let workers: Vec<_> = (0..4u8)
        .map(|worker| {
            let heap = heap.clone();
            thread::spawn(move || {
                let mut kept = Vec::new();
                for round in 0..50u8 {
                    let len = 1 + ((worker as usize * 7 + round as usize) % 24);
                    let id = heap.create(ElementType::Byte, len as u64).unwrap();
                    let fill = worker.wrapping_mul(50).wrapping_add(round);
                    heap.set(id, &vec![fill; len]).unwrap();
                    if round % 2 == 0 {
                        heap.decrease_ref_count(id).unwrap();
                    } else {
                        kept.push((id, vec![fill; len]));
                    }
                }
                kept
            })
        })
        .collect();

    for _ in 0..20 {
        collector.tick().unwrap();
        assert_no_overlap(&heap.snapshot());
        thread::yield_now();
    }

    let kept: Vec<_> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();
    collector.tick().unwrap();

    for (id, expected) in kept {
        assert_eq!(heap.get(id).unwrap(), expected, "content of {id}");
    }
    assert_no_overlap(&heap.snapshot());
}

#[test]
fn test_stats_track_usage() {
    let heap = heap(100);
    let a = heap.create(ElementType::Float32, 5).unwrap();
    heap.create(ElementType::Byte, 10).unwrap();
    heap.decrease_ref_count(a).unwrap();

    let stats = heap.stats();
    assert_eq!(stats.used_bytes, 30);
    assert_eq!(stats.pending_sweep, 1);

    heap.collect().unwrap();
    let stats = heap.stats();
    assert_eq!(stats.used_bytes, 10);
    assert_eq!(stats.free_bytes, 90);
    assert_eq!(stats.gap_bytes, 20);
    assert_eq!(stats.next_id, BlockId::new(3));
}
