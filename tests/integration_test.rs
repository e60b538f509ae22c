//! Integration tests for the memmanager allocator

use memmanager::BlockState::{Allocated, Free};
use memmanager::{Address, HeapError, MemoryManager};
use proptest::prelude::*;
use proptest::sample::Index;

#[test]
fn test_example_scenario() {
    let mut manager = MemoryManager::new(100).unwrap();

    let a = manager.allocate(30).unwrap();
    assert_eq!(manager.render(), vec![(30, Allocated), (70, Free)]);

    let b = manager.allocate(20).unwrap();
    assert_eq!(
        manager.render(),
        vec![(30, Allocated), (20, Allocated), (50, Free)]
    );

    manager.deallocate(a).unwrap();
    assert_eq!(
        manager.render(),
        vec![(30, Free), (20, Allocated), (50, Free)]
    );

    manager.deallocate(b).unwrap();
    assert_eq!(manager.render(), vec![(100, Free)]);
}

#[test]
fn test_split_and_exact_fit() {
    let mut manager = MemoryManager::new(64).unwrap();
    manager.allocate(16).unwrap();
    assert_eq!(manager.render(), vec![(16, Allocated), (48, Free)]);

    let mut manager = MemoryManager::new(64).unwrap();
    manager.allocate(64).unwrap();
    assert_eq!(manager.render(), vec![(64, Allocated)]);
    assert_eq!(manager.to_string(), "[64, allocated]");
}

#[test]
fn test_exhaustion_leaves_blocks_untouched() {
    let mut manager = MemoryManager::new(100).unwrap();

    assert_eq!(
        manager.allocate(101),
        Err(HeapError::OutOfMemory {
            requested: 101,
            largest_free: 100
        })
    );
    assert_eq!(manager.render(), vec![(100, Free)]);

    manager.allocate(100).unwrap();
    assert!(matches!(
        manager.allocate(1),
        Err(HeapError::OutOfMemory { .. })
    ));
    assert_eq!(manager.render(), vec![(100, Allocated)]);
}

#[test]
fn test_round_trip_restores_rendering() {
    let mut manager = MemoryManager::new(256).unwrap();
    let before = manager.render();

    let a = manager.allocate(100).unwrap();
    manager.deallocate(a).unwrap();

    assert_eq!(manager.render(), before);
}

#[test]
fn test_every_free_order_fully_coalesces() {
    let orders = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    let sizes = [10, 25, 15];

    for order in orders {
        let mut manager = MemoryManager::new(50).unwrap();
        let addrs: Vec<Address> = sizes
            .iter()
            .map(|&size| manager.allocate(size).unwrap())
            .collect();
        assert_eq!(
            manager.render(),
            vec![(10, Allocated), (25, Allocated), (15, Allocated)]
        );

        for i in order {
            manager.deallocate(addrs[i]).unwrap();
            assert_eq!(manager.check_invariants(), Ok(()), "order {order:?}");
        }

        assert_eq!(manager.render(), vec![(50, Free)], "order {order:?}");
    }
}

#[test]
fn test_invalid_free_is_safe() {
    let mut manager = MemoryManager::new(100).unwrap();
    let a = manager.allocate(30).unwrap();
    let before = manager.render();

    for bogus in [1, 29, 99, 100, 4096] {
        let address = Address::new(bogus);
        assert_eq!(
            manager.deallocate(address),
            Err(HeapError::InvalidFree(address))
        );
        assert_eq!(manager.render(), before);
    }

    manager.deallocate(a).unwrap();
    assert_eq!(manager.render(), vec![(100, Free)]);
}

#[test]
fn test_double_free_is_rejected_without_side_effects() {
    let mut manager = MemoryManager::new(90).unwrap();
    let a = manager.allocate(30).unwrap();
    let b = manager.allocate(30).unwrap();
    manager.allocate(30).unwrap();

    manager.deallocate(b).unwrap();
    let before = manager.render();

    assert_eq!(manager.deallocate(b), Err(HeapError::DoubleFree(b)));
    assert_eq!(manager.render(), before);

    // After `a` is freed it absorbs `b`, so `b` no longer starts a block.
    manager.deallocate(a).unwrap();
    assert_eq!(manager.render(), vec![(60, Free), (30, Allocated)]);
    assert_eq!(manager.deallocate(b), Err(HeapError::InvalidFree(b)));
}

#[test]
fn test_first_fit_reuses_earliest_hole() {
    let mut manager = MemoryManager::new(100).unwrap();
    let a = manager.allocate(10).unwrap();
    manager.allocate(10).unwrap();
    let c = manager.allocate(30).unwrap();
    manager.allocate(10).unwrap();

    manager.deallocate(a).unwrap();
    manager.deallocate(c).unwrap();

    // The 10-byte hole at the front fits exactly.
    assert_eq!(manager.allocate(10).unwrap(), a);
    // The next request skips to the 30-byte hole and splits it.
    assert_eq!(manager.allocate(5).unwrap(), c);
    assert_eq!(
        manager.render(),
        vec![
            (10, Allocated),
            (10, Allocated),
            (5, Allocated),
            (25, Free),
            (10, Allocated),
            (40, Free),
        ]
    );
}

#[test]
fn test_fragmentation_is_visible_and_recoverable() {
    let mut manager = MemoryManager::new(100).unwrap();
    let addrs: Vec<Address> = (0..10).map(|_| manager.allocate(10).unwrap()).collect();

    for addr in addrs.iter().step_by(2) {
        manager.deallocate(*addr).unwrap();
    }

    let stats = manager.stats();
    assert_eq!(stats.free, 50);
    assert_eq!(stats.largest_free, 10);
    assert!(stats.fragmentation() > 0.5);
    assert!(matches!(
        manager.allocate(20),
        Err(HeapError::OutOfMemory { .. })
    ));

    for addr in addrs.iter().skip(1).step_by(2) {
        manager.deallocate(*addr).unwrap();
    }

    assert_eq!(manager.render(), vec![(100, Free)]);
    assert_eq!(manager.stats().fragmentation(), 0.0);
    manager.allocate(100).unwrap();
}

#[test]
fn test_allocations_stay_in_bounds_and_never_overlap() {
    let capacity = 512;
    let mut manager = MemoryManager::new(capacity).unwrap();
    let mut live: Vec<(usize, usize)> = Vec::new();

    for size in [7, 1, 64, 13, 100, 3, 200] {
        let start = manager.allocate(size).unwrap().offset();
        let end = start + size;
        assert!(end <= capacity);

        for &(other_start, other_end) in &live {
            assert!(end <= other_start || start >= other_end);
        }
        live.push((start, end));
    }
}

#[test]
fn test_allocation_contents_survive_neighbour_churn() {
    let mut manager = MemoryManager::new(64).unwrap();
    let a = manager.allocate(16).unwrap();
    let b = manager.allocate(16).unwrap();

    manager.bytes_mut(b).unwrap().copy_from_slice(&[7u8; 16]);
    manager.deallocate(a).unwrap();
    let c = manager.allocate(8).unwrap();
    manager.bytes_mut(c).unwrap().fill(1);

    assert_eq!(manager.bytes(b).unwrap(), &[7u8; 16]);
}

#[derive(Debug, Clone)]
enum Step {
    /// Allocate this many bytes.
    Alloc(usize),
    /// Free one of the live allocations.
    Free(Index),
    /// Free an arbitrary offset, usually not a block start.
    FreeRaw(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (1_usize..96).prop_map(Step::Alloc),
        2 => any::<Index>().prop_map(Step::Free),
        1 => (0_usize..300).prop_map(Step::FreeRaw),
    ]
}

proptest! {
    #[test]
    fn test_any_workload_preserves_invariants(
        capacity in 1_usize..256,
        steps in proptest::collection::vec(step(), 0..200),
    ) {
        let mut manager = MemoryManager::new(capacity).unwrap();
        let mut live: Vec<(Address, usize)> = Vec::new();

        for step in steps {
            let before = manager.render();

            match step {
                Step::Alloc(size) => match manager.allocate(size) {
                    Ok(address) => {
                        let (start, end) = (address.offset(), address.offset() + size);
                        prop_assert!(end <= capacity);
                        for &(other, other_size) in &live {
                            let other_end = other.offset() + other_size;
                            prop_assert!(end <= other.offset() || start >= other_end);
                        }
                        live.push((address, size));
                    }
                    Err(HeapError::OutOfMemory { largest_free, .. }) => {
                        prop_assert!(largest_free < size);
                        prop_assert_eq!(manager.render(), before);
                    }
                    Err(err) => prop_assert!(false, "unexpected {}", err),
                },
                Step::Free(index) if !live.is_empty() => {
                    let (address, _) = live.swap_remove(index.index(live.len()));
                    prop_assert_eq!(manager.deallocate(address), Ok(()));
                }
                Step::Free(_) => {}
                Step::FreeRaw(offset) => {
                    let address = Address::new(offset);
                    if !live.iter().any(|&(live_address, _)| live_address == address) {
                        prop_assert!(manager.deallocate(address).is_err());
                        prop_assert_eq!(manager.render(), before);
                    }
                }
            }

            prop_assert_eq!(manager.check_invariants(), Ok(()));

            let stats = manager.stats();
            prop_assert_eq!(stats.capacity, capacity);
            prop_assert_eq!(
                stats.allocated,
                live.iter().map(|(_, size)| size).sum::<usize>()
            );
        }

        for (address, _) in live.drain(..) {
            prop_assert_eq!(manager.deallocate(address), Ok(()));
        }
        prop_assert_eq!(manager.render(), vec![(capacity, Free)]);
    }
}
