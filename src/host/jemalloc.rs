//! Binding to a jemalloc with extent hook support.
//!
//! Arenas are created through `mallctl("arenas.create")` with the hook table
//! as the new value. Allocations go through the `*allocx` family with the
//! thread cache disabled and the arena pinned, so every block is carved from
//! this arena's extents.

use super::HostAllocator;
use crate::error::HostError;
use crate::hooks::ExtentHooks;
use core::ffi::{c_char, c_int, c_uint, c_void};
use core::mem;
use core::ptr::NonNull;

// jemalloc lives in libc on FreeBSD-derived systems.
#[cfg_attr(not(target_os = "freebsd"), link(name = "jemalloc"))]
unsafe extern "C" {
    fn mallctl(
        name: *const c_char,
        oldp: *mut c_void,
        oldlenp: *mut usize,
        newp: *mut c_void,
        newlen: usize,
    ) -> c_int;
    fn mallocx(size: usize, flags: c_int) -> *mut c_void;
    fn rallocx(ptr: *mut c_void, size: usize, flags: c_int) -> *mut c_void;
    fn dallocx(ptr: *mut c_void, flags: c_int);
}

/// `MALLOCX_TCACHE_NONE`
const TCACHE_NONE: c_int = 1 << 8;

/// `MALLOCX_LG_ALIGN(log2(alignment))`
#[inline]
fn align_flag(alignment: usize) -> c_int {
    debug_assert!(alignment.is_power_of_two());
    alignment.trailing_zeros() as c_int
}

/// `MALLOCX_ARENA(arena)`
#[inline]
fn arena_flag(arena: u32) -> c_int {
    ((arena as c_int) + 1) << 20
}

#[inline]
fn flags(arena: u32, alignment: usize) -> c_int {
    align_flag(alignment) | TCACHE_NONE | arena_flag(arena)
}

/// The process's jemalloc.
#[derive(Clone, Copy, Debug, Default)]
pub struct Jemalloc;

impl HostAllocator for Jemalloc {
    unsafe fn create_arena(&self, hooks: NonNull<ExtentHooks>) -> Result<u32, HostError> {
        let mut index: c_uint = 0;
        let mut index_len = mem::size_of::<c_uint>();
        let mut hooks = hooks.as_ptr();
        let ret = unsafe {
            mallctl(
                c"arenas.create".as_ptr(),
                (&raw mut index).cast(),
                &mut index_len,
                (&raw mut hooks).cast(),
                mem::size_of::<*mut ExtentHooks>(),
            )
        };
        match ret {
            0 => Ok(index),
            libc::EAGAIN => Err(HostError::TooManyArenas),
            code => Err(HostError::CreateFailed { code }),
        }
    }

    unsafe fn allocate(&self, arena: u32, size: usize, alignment: usize) -> *mut u8 {
        // mallocx leaves zero-byte requests undefined.
        let size = size.max(1);
        unsafe { mallocx(size, flags(arena, alignment)).cast() }
    }

    unsafe fn reallocate(
        &self,
        arena: u32,
        ptr: *mut u8,
        size: usize,
        alignment: usize,
    ) -> *mut u8 {
        if ptr.is_null() {
            return unsafe { self.allocate(arena, size, alignment) };
        }
        let size = size.max(1);
        unsafe { rallocx(ptr.cast(), size, flags(arena, alignment)).cast() }
    }

    unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        unsafe { dallocx(ptr.cast(), TCACHE_NONE) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_encoding() {
        assert_eq!(align_flag(1), 0);
        assert_eq!(align_flag(4096), 12);
        assert_eq!(arena_flag(0), 1 << 20);
        assert_eq!(arena_flag(5), 6 << 20);
        assert_eq!(flags(2, 64), 6 | (1 << 8) | (3 << 20));
    }
}
