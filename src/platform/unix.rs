//! Unix implementation on top of `mmap`/`munmap`.
//!
//! Every fixed-address operation is a `MAP_FIXED` replacement mapping: it
//! atomically swaps whatever was mapped there, so commit, guard and purge all
//! have the same shape and differ only in protection and reservation flags.

use core::ffi::c_void;
use core::ptr;

use libc::{
    MAP_ANON, MAP_FAILED, MAP_FIXED, MAP_PRIVATE, PROT_NONE, PROT_READ, PROT_WRITE, mmap, munmap,
};

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        const MAP_NORESERVE: i32 = libc::MAP_NORESERVE;
    } else {
        const MAP_NORESERVE: i32 = 0;
    }
}

const GUARD_FLAGS: i32 = MAP_PRIVATE | MAP_ANON | MAP_NORESERVE;
const BACKED_FLAGS: i32 = MAP_PRIVATE | MAP_ANON;

pub unsafe fn reserve_aligned(size: usize, align: usize) -> *mut u8 {
    // No MAP_ALIGNED on most systems: over-reserve, then trim both ends.
    let Some(padded) = size.checked_add(align) else {
        return ptr::null_mut();
    };
    let raw = unsafe { mmap(ptr::null_mut(), padded, PROT_NONE, GUARD_FLAGS, -1, 0) };
    if raw == MAP_FAILED {
        return ptr::null_mut();
    }

    let raw = raw as usize;
    let start = (raw + align - 1) & !(align - 1);
    let head = start - raw;
    let tail = padded - head - size;
    unsafe {
        if head > 0 {
            munmap(raw as *mut c_void, head);
        }
        if tail > 0 {
            munmap((start + size) as *mut c_void, tail);
        }
    }
    start as *mut u8
}

pub unsafe fn release(ptr: *mut u8, size: usize) {
    unsafe { munmap(ptr as *mut c_void, size) };
}

#[inline]
unsafe fn map_fixed(ptr: *mut u8, size: usize, prot: i32, flags: i32) -> bool {
    let ret = unsafe { mmap(ptr as *mut c_void, size, prot, flags | MAP_FIXED, -1, 0) };
    ret != MAP_FAILED && ret as *mut u8 == ptr
}

pub unsafe fn commit(ptr: *mut u8, size: usize) -> bool {
    unsafe { map_fixed(ptr, size, PROT_READ | PROT_WRITE, BACKED_FLAGS) }
}

pub unsafe fn guard(ptr: *mut u8, size: usize) -> bool {
    unsafe { map_fixed(ptr, size, PROT_NONE, GUARD_FLAGS) }
}

pub unsafe fn purge(ptr: *mut u8, size: usize) -> bool {
    // A fresh anonymous mapping drops the old pages outright, which is what a
    // forced purge promises; MADV_FREE would only defer it.
    unsafe { map_fixed(ptr, size, PROT_READ | PROT_WRITE, BACKED_FLAGS) }
}
