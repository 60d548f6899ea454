//! Integration tests for the stats feature.
//!
//! Run with: cargo test --features stats --test stats
//!
//! The counters are process-wide, so this binary holds a single test.

#![cfg(feature = "stats")]

use contarena::arena::{Arena, ArenaConfig, PurgeKind};
use contarena::capability::NoCapability;
use contarena::stats;
use contarena::validate::Validation;
use contarena::PAGE_SIZE;
use std::ptr;

#[test]
fn test_hook_counters_track_a_known_sequence() {
    let a = Arena::reserve_with(ArenaConfig::with_lg_size(20), NoCapability, Validation::Enabled)
        .unwrap();
    let before = stats::snapshot();

    let (mut zero, mut commit) = (false, false);
    let big = a.grow(ptr::null_mut(), 2 * PAGE_SIZE, PAGE_SIZE, &mut zero, &mut commit);
    let small = a.grow(ptr::null_mut(), 100, 16, &mut zero, &mut commit);
    assert!(!big.is_null() && !small.is_null());
    assert!(a.grow(ptr::null_mut(), 1 << 21, PAGE_SIZE, &mut zero, &mut commit).is_null());

    assert!(!a.purge(PurgeKind::Lazy, big, 2 * PAGE_SIZE, PAGE_SIZE, PAGE_SIZE));
    assert!(!a.purge(PurgeKind::Forced, big, 2 * PAGE_SIZE, 0, 2 * PAGE_SIZE));
    a.destroy(small, 100, true);

    let after = stats::snapshot();
    assert_eq!(after.grow_calls - before.grow_calls, 3);
    assert_eq!(after.grow_count - before.grow_count, 2);
    assert_eq!(after.grow_failures - before.grow_failures, 1);
    assert_eq!(after.grow_bytes - before.grow_bytes, 3 * PAGE_SIZE as u64);
    assert_eq!(after.purge_lazy_count - before.purge_lazy_count, 1);
    assert_eq!(after.purge_forced_count - before.purge_forced_count, 1);
    assert_eq!(after.purge_bytes - before.purge_bytes, 3 * PAGE_SIZE as u64);
    assert_eq!(after.destroy_count - before.destroy_count, 1);
    assert_eq!(after.destroy_bytes - before.destroy_bytes, PAGE_SIZE as u64);
}
