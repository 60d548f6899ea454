//! Extent hook benchmarks, with and without representability widening.
//!
//! The arena never reuses address space, so grow benchmarks run in batches,
//! each against a freshly reserved arena. Reservation and release are kept
//! out of the measured time.

use contarena::arena::{Arena, ArenaConfig, PurgeKind};
use contarena::capability::{Capability, Cheri128, NoCapability};
use contarena::validate::Validation;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::ptr;
use std::time::{Duration, Instant};

const BATCH: u64 = 256;

fn reserve_for<C: Capability>(cap: C, bytes: usize) -> Arena<C> {
    let lg = bytes.next_power_of_two().trailing_zeros().max(16);
    Arena::reserve_with(ArenaConfig::with_lg_size(lg), cap, Validation::Disabled).unwrap()
}

/// Time `iters` grows of `size` bytes, reserving a new arena every `BATCH`.
fn timed_grows<C: Capability + Copy>(cap: C, size: usize, iters: u64) -> Duration {
    let mut total = Duration::ZERO;
    let mut remaining = iters;
    while remaining > 0 {
        let n = remaining.min(BATCH);
        // Room for alignment padding and widening on every extent.
        let arena = reserve_for(cap, 2 * size.max(4096) * n as usize);
        let (mut zero, mut commit) = (false, false);

        let start = Instant::now();
        for _ in 0..n {
            let p = arena.grow(ptr::null_mut(), black_box(size), 16, &mut zero, &mut commit);
            assert!(!p.is_null());
            black_box(p);
        }
        total += start.elapsed();
        remaining -= n;
    }
    total
}

fn bench_grow(c: &mut Criterion) {
    let mut group = c.benchmark_group("grow");
    for size in [4096usize, 65536, (1 << 20) + 1] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("no_capability", size), &size, |b, &size| {
            b.iter_custom(|iters| timed_grows(NoCapability, size, iters));
        });
        group.bench_with_input(BenchmarkId::new("cheri128", size), &size, |b, &size| {
            b.iter_custom(|iters| timed_grows(Cheri128::pure(), size, iters));
        });
    }
    group.finish();
}

fn bench_purge(c: &mut Criterion) {
    let mut group = c.benchmark_group("purge_forced");
    for pages in [1usize, 16, 256] {
        let size = pages * contarena::PAGE_SIZE;
        let arena = reserve_for(NoCapability, 2 * size);
        let (mut zero, mut commit) = (false, false);
        let p = arena.grow(ptr::null_mut(), size, 16, &mut zero, &mut commit);
        assert!(!p.is_null());

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pages), &size, |b, &size| {
            b.iter(|| black_box(arena.purge(PurgeKind::Forced, p, size, 0, size)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_grow, bench_purge);
criterion_main!(benches);
