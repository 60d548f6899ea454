//! Extent hook statistics counters.
//!
//! All counters use `Relaxed` ordering: they are observational only. The
//! arena lock orders the hooks themselves.
//!
//! # Usage
//!
//! ```ignore
//! let snap = contarena::stats::snapshot();
//! println!("grown: {} bytes in {} extents", snap.grow_bytes, snap.grow_count);
//! ```

use core::sync::atomic::{AtomicU64, Ordering};

pub(crate) struct Stats {
    // ---- Grow ----
    /// Grow hook invocations, including rejected ones.
    pub grow_calls: AtomicU64,
    /// Extents handed out.
    pub grow_count: AtomicU64,
    /// Bytes handed out, after representability widening.
    pub grow_bytes: AtomicU64,
    /// Grow requests refused for lack of space or a failed commit.
    pub grow_failures: AtomicU64,
    /// Bytes skipped over to satisfy alignment.
    pub alignment_padding: AtomicU64,

    // ---- Destroy ----
    pub destroy_count: AtomicU64,
    pub destroy_bytes: AtomicU64,

    // ---- Purge ----
    pub purge_lazy_count: AtomicU64,
    pub purge_forced_count: AtomicU64,
    pub purge_bytes: AtomicU64,
}

impl Stats {
    const fn new() -> Self {
        Self {
            grow_calls: AtomicU64::new(0),
            grow_count: AtomicU64::new(0),
            grow_bytes: AtomicU64::new(0),
            grow_failures: AtomicU64::new(0),
            alignment_padding: AtomicU64::new(0),
            destroy_count: AtomicU64::new(0),
            destroy_bytes: AtomicU64::new(0),
            purge_lazy_count: AtomicU64::new(0),
            purge_forced_count: AtomicU64::new(0),
            purge_bytes: AtomicU64::new(0),
        }
    }
}

pub(crate) static STATS: Stats = Stats::new();

/// A point-in-time snapshot of the hook counters, summed over every arena in
/// the process.
///
/// Each field is loaded atomically, but the snapshot as a whole is not
/// consistent: hooks on other threads may run between loads.
#[derive(Clone, Copy, Debug, Default)]
pub struct Snapshot {
    pub grow_calls: u64,
    pub grow_count: u64,
    pub grow_bytes: u64,
    pub grow_failures: u64,
    pub alignment_padding: u64,
    pub destroy_count: u64,
    pub destroy_bytes: u64,
    pub purge_lazy_count: u64,
    pub purge_forced_count: u64,
    pub purge_bytes: u64,
}

/// Load all counters with `Relaxed` ordering and return a [`Snapshot`].
pub fn snapshot() -> Snapshot {
    let s = &STATS;
    Snapshot {
        grow_calls: s.grow_calls.load(Ordering::Relaxed),
        grow_count: s.grow_count.load(Ordering::Relaxed),
        grow_bytes: s.grow_bytes.load(Ordering::Relaxed),
        grow_failures: s.grow_failures.load(Ordering::Relaxed),
        alignment_padding: s.alignment_padding.load(Ordering::Relaxed),
        destroy_count: s.destroy_count.load(Ordering::Relaxed),
        destroy_bytes: s.destroy_bytes.load(Ordering::Relaxed),
        purge_lazy_count: s.purge_lazy_count.load(Ordering::Relaxed),
        purge_forced_count: s.purge_forced_count.load(Ordering::Relaxed),
        purge_bytes: s.purge_bytes.load(Ordering::Relaxed),
    }
}
