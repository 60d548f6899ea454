//! Every entry point but `initialize()` requires an initialized arena.
//!
//! Nothing in this binary initializes the process-wide arena.

use contarena::ContinuousArena;
use std::alloc::{GlobalAlloc, Layout};

static ARENA: ContinuousArena = ContinuousArena;

#[test]
#[should_panic(expected = "used before initialize()")]
fn test_allocate_before_initialize_panics() {
    ContinuousArena::allocate_aligned(16, 64);
}

#[test]
#[should_panic(expected = "used before initialize()")]
fn test_per_thread_before_initialize_panics() {
    ContinuousArena::initialize_per_thread();
}

#[test]
#[should_panic(expected = "used before initialize()")]
fn test_free_before_initialize_panics() {
    unsafe { ContinuousArena::free(std::ptr::null_mut()) };
}

#[test]
fn test_not_initialized() {
    assert!(!ContinuousArena::is_initialized());
}

#[test]
fn test_global_alloc_falls_back_before_initialize() {
    let layout = Layout::from_size_align(100, 16).unwrap();
    unsafe {
        let p = ARENA.alloc(layout);
        assert!(!p.is_null());
        assert_eq!(p as usize % 16, 0);
        p.write_bytes(0x3C, 100);

        let q = ARENA.realloc(p, layout, 5000);
        assert!(!q.is_null());
        assert_eq!(*q.add(99), 0x3C);
        ARENA.dealloc(q, Layout::from_size_align(5000, 16).unwrap());
    }
    assert!(!ContinuousArena::is_initialized());
}
