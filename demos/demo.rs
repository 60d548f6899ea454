use contarena::host::DirectHost;
use contarena::{ContinuousArena, PurgeKind};
use std::time::Instant;

static HOST: DirectHost = DirectHost::new();

fn main() {
    println!("contarena demo");
    println!("==============\n");

    ContinuousArena::initialize(&HOST);
    ContinuousArena::initialize_per_thread();

    let arena = ContinuousArena::arena();
    let region = arena.region();
    println!(
        "Region:      {:#x}..{:#x} ({} MiB), host arena #{}",
        region.start,
        region.end,
        region.len() >> 20,
        ContinuousArena::arena_index()
    );
    println!("Grown:       {} bytes (host base block)", arena.current() - region.start);

    // Aligned allocation
    let p = ContinuousArena::allocate_aligned(256, 1000);
    println!("Allocated:   1000 bytes at {p:p} (256-aligned = {})", p as usize % 256 == 0);
    unsafe { p.write_bytes(0x42, 1000) };

    // Growth moves the block, contents travel with it
    let q = unsafe { ContinuousArena::reallocate(p, 64 * 1024) };
    println!("Reallocated: 64 KiB at {q:p}, first byte = {:#x}", unsafe { *q });

    // Purge keeps the range but drops the contents
    let purged = unsafe { HOST.purge(q, PurgeKind::Forced) };
    println!("Purged:      hook returned {purged}, first byte now = {:#x}", unsafe { *q });

    // Freed extents become guard pages and are never handed out again
    let high_water = arena.current();
    unsafe { ContinuousArena::free(q) };
    let r = ContinuousArena::allocate_aligned(16, 64 * 1024);
    println!(
        "Reused:      {} (new block at {r:p}, high-water mark was {high_water:#x})",
        (r as usize) < high_water
    );
    unsafe { ContinuousArena::free(r) };

    // Multi-threaded workload
    println!("\nMulti-threaded (4 threads, 1000 allocs each):");
    let start = Instant::now();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                ContinuousArena::initialize_per_thread();
                for i in 0..1000usize {
                    let p = ContinuousArena::allocate_aligned(16, 64 + i);
                    assert!(!p.is_null());
                    unsafe { ContinuousArena::free(p) };
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    let elapsed = start.elapsed();
    let used = arena.current() - region.start;
    println!("  completed in {elapsed:?}, {} of {} MiB grown", used >> 20, region.len() >> 20);

    #[cfg(feature = "stats")]
    {
        let s = contarena::stats::snapshot();
        println!(
            "\nStats: {} grows ({} bytes, {} padding), {} destroys, {} purges",
            s.grow_count,
            s.grow_bytes,
            s.alignment_padding,
            s.destroy_count,
            s.purge_forced_count + s.purge_lazy_count
        );
    }

    println!("\nDone.");
}
