//! C-ABI exports over the process-wide arena, backed by jemalloc.
//!
//! Gated behind `features = ["ffi"]`. A panic inside any of these aborts the
//! process: fatal arena checks never unwind into C frames.

use crate::global::ContinuousArena;
use crate::host::Jemalloc;

static HOST: Jemalloc = Jemalloc;

#[unsafe(no_mangle)]
pub extern "C" fn contarena_initialize() {
    ContinuousArena::initialize(&HOST);
}

#[unsafe(no_mangle)]
pub extern "C" fn contarena_initialize_per_thread() {
    ContinuousArena::initialize_per_thread();
}

#[unsafe(no_mangle)]
pub extern "C" fn contarena_allocate_aligned(alignment: usize, size: usize) -> *mut u8 {
    ContinuousArena::allocate_aligned(alignment, size)
}

/// # Safety
///
/// `ptr` must be null or a live block from this arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn contarena_reallocate(ptr: *mut u8, size: usize) -> *mut u8 {
    unsafe { ContinuousArena::reallocate(ptr, size) }
}

/// # Safety
///
/// `ptr` must be null or a live block from this arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn contarena_free(ptr: *mut u8) {
    unsafe { ContinuousArena::free(ptr) }
}
