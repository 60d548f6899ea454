//! End-to-end extent hook scenarios against a 1 GiB arena.
//!
//! Every call goes through the C-ABI hook table, the same way a host
//! allocator drives the arena.

use contarena::capability::Capability;
use contarena::hooks::{ExtentHooks, HookTable};
use contarena::{Arena, ArenaConfig, PAGE_SIZE};
use std::ffi::c_void;
use std::ptr;

const ARENA_IND: u32 = 0;

fn gib_arena() -> Arena {
    Arena::reserve(ArenaConfig::with_lg_size(30)).unwrap()
}

unsafe fn grow(hooks: *mut ExtentHooks, size: usize, alignment: usize) -> *mut c_void {
    let (mut zero, mut commit) = (false, false);
    let alloc = unsafe { (*hooks).alloc.unwrap() };
    let p = unsafe {
        alloc(hooks, ptr::null_mut(), size, alignment, &mut zero, &mut commit, ARENA_IND)
    };
    if !p.is_null() {
        assert!(zero, "fresh extents are zero-filled");
        assert!(commit, "fresh extents are committed");
    }
    p
}

#[test]
fn grow_small_extent_in_fresh_region() {
    let arena = gib_arena();
    let region = arena.region();
    assert_eq!(region.len(), 1 << 30);
    assert_eq!(region.start % (1 << 30), 0);

    let table = HookTable::new(&arena);
    let hooks = table.as_ptr().as_ptr();
    let a = unsafe { grow(hooks, 4096, 16) } as usize;
    assert_ne!(a, 0);
    assert_eq!(a % 16, 0);
    assert!(region.contains_range(a, 4096));
    assert!(arena.current() >= a + 4096);

    // The extent is usable.
    unsafe { ptr::write_bytes(a as *mut u8, 0x5A, 4096) };
}

#[test]
fn grow_past_capacity_returns_null() {
    let arena = gib_arena();
    let table = HookTable::new(&arena);
    let hooks = table.as_ptr().as_ptr();
    unsafe { grow(hooks, PAGE_SIZE, PAGE_SIZE) };

    let before = arena.current();
    let remaining = arena.lock().remaining();
    let p = unsafe { grow(hooks, remaining + 1, 16) };
    assert!(p.is_null());
    assert_eq!(arena.current(), before);

    // Exactly the remainder still fits, unless widening pushes it over.
    if !arena.capability().mode().is_pure() {
        let p = unsafe { grow(hooks, remaining, PAGE_SIZE) };
        assert!(!p.is_null());
        assert_eq!(arena.current(), arena.region().end);
    }
}

#[test]
fn destroyed_extent_is_never_reused() {
    let arena = gib_arena();
    let table = HookTable::new(&arena);
    let hooks = table.as_ptr().as_ptr();

    let a1 = unsafe { grow(hooks, 4096, 16) };
    let high_water = arena.current();
    unsafe {
        let destroy = (*hooks).destroy.unwrap();
        destroy(hooks, a1, 4096, true, ARENA_IND);
    }
    let a2 = unsafe { grow(hooks, 4096, 16) };
    assert!(a2 as usize >= a1 as usize + 4096);
    assert!(a2 as usize >= high_water);
}

#[test]
fn forced_purge_zeroes_but_keeps_range() {
    let arena = gib_arena();
    let table = HookTable::new(&arena);
    let hooks = table.as_ptr().as_ptr();

    let a = unsafe { grow(hooks, 4096, 16) };
    let bytes = a.cast::<u8>();
    unsafe {
        bytes.write_bytes(0xEE, 4096);
        let purge = (*hooks).purge_forced.unwrap();
        assert!(!purge(hooks, a, 4096, 0, 4096, ARENA_IND), "purge reports success");
    }
    let contents = unsafe { std::slice::from_raw_parts(bytes, 4096) };
    assert!(contents.iter().all(|&b| b == 0));
    assert!(arena.lock().is_allocated_range(a as usize, 4096));
}

#[test]
fn lazy_purge_behaves_as_forced() {
    let arena = gib_arena();
    let table = HookTable::new(&arena);
    let hooks = table.as_ptr().as_ptr();

    let a = unsafe { grow(hooks, 4 * PAGE_SIZE, PAGE_SIZE) };
    let bytes = a.cast::<u8>();
    unsafe {
        bytes.write_bytes(0x77, 4 * PAGE_SIZE);
        let purge = (*hooks).purge_lazy.unwrap();
        assert!(!purge(hooks, a, 4 * PAGE_SIZE, PAGE_SIZE, 2 * PAGE_SIZE, ARENA_IND));
        // Only the window is discarded.
        assert_eq!(*bytes, 0x77);
        assert_eq!(*bytes.add(PAGE_SIZE), 0);
        assert_eq!(*bytes.add(3 * PAGE_SIZE - 1), 0);
        assert_eq!(*bytes.add(3 * PAGE_SIZE), 0x77);
    }
}

#[test]
fn extents_are_disjoint_and_monotonic() {
    let arena = gib_arena();
    let table = HookTable::new(&arena);
    let hooks = table.as_ptr().as_ptr();

    let mut last_end = arena.region().start;
    for (i, size) in [1usize, 100, 4096, 4097, 65536, 3 * 4096 + 1].into_iter().enumerate() {
        let align = 1usize << (i * 3);
        let before = arena.current();
        let p = unsafe { grow(hooks, size, align) } as usize;
        assert_ne!(p, 0);
        assert_eq!(p % align, 0);
        assert!(p >= last_end, "extent {p:#x} overlaps the previous one");
        assert!(arena.current() >= before + size);
        last_end = arena.current();
    }
}
