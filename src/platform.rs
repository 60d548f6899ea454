//! OS virtual memory interface for the arena.
//!
//! The arena needs five primitives: reserve an aligned span of address space
//! without backing it, release that reservation, commit read/write pages at a
//! fixed address inside it, turn committed pages back into an inaccessible
//! guard, and replace committed pages with fresh zero-filled ones.
//!
//! All addresses passed to the fixed-address primitives must be page aligned
//! and lie inside a live reservation.

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod windows;
        use windows as os;
    } else if #[cfg(unix)] {
        mod unix;
        use unix as os;
    } else {
        compile_error!("contarena supports unix and windows targets only");
    }
}

/// Reserve `size` bytes of address space aligned to `align` (a power of two).
/// The pages are inaccessible and carry no physical backing.
/// Returns null on failure.
///
/// # Safety
/// The caller owns the returned reservation and must release it with
/// [`release`] (or leak it for the life of the process).
#[inline]
pub unsafe fn reserve_aligned(size: usize, align: usize) -> *mut u8 {
    debug_assert!(align.is_power_of_two());
    unsafe { os::reserve_aligned(size, align) }
}

/// Release a reservation made by [`reserve_aligned`], committed pages included.
///
/// # Safety
/// `ptr` and `size` must be exactly a reservation returned by `reserve_aligned`,
/// and nothing may reference it afterwards.
#[inline]
pub unsafe fn release(ptr: *mut u8, size: usize) {
    unsafe { os::release(ptr, size) }
}

/// Back `[ptr, ptr + size)` with zero-filled read/write pages.
/// Returns false if the OS refused.
///
/// # Safety
/// The range must lie inside a live reservation and be page aligned.
#[inline]
pub unsafe fn commit(ptr: *mut u8, size: usize) -> bool {
    unsafe { os::commit(ptr, size) }
}

/// Drop the physical pages behind `[ptr, ptr + size)` and make the range
/// inaccessible again, keeping the address space reserved.
///
/// # Safety
/// The range must lie inside a live reservation and be page aligned. Any
/// later access to it faults.
#[inline]
pub unsafe fn guard(ptr: *mut u8, size: usize) -> bool {
    unsafe { os::guard(ptr, size) }
}

/// Replace `[ptr, ptr + size)` with a fresh read/write mapping; prior contents
/// are discarded and subsequent reads observe zeroes.
///
/// # Safety
/// The range must lie inside a live reservation and be page aligned.
#[inline]
pub unsafe fn purge(ptr: *mut u8, size: usize) -> bool {
    unsafe { os::purge(ptr, size) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PAGE_SIZE;

    const ALIGN: usize = 1 << 24;

    #[test]
    fn test_reserve_is_aligned() {
        unsafe {
            let size = 16 * PAGE_SIZE;
            let ptr = reserve_aligned(size, ALIGN);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % ALIGN, 0);
            release(ptr, size);
        }
    }

    #[test]
    fn test_commit_is_zeroed_and_writable() {
        unsafe {
            let size = 4 * PAGE_SIZE;
            let base = reserve_aligned(size, ALIGN);
            assert!(!base.is_null());
            let ptr = base.add(PAGE_SIZE);
            assert!(commit(ptr, 2 * PAGE_SIZE));
            for i in 0..2 * PAGE_SIZE {
                assert_eq!(*ptr.add(i), 0);
            }
            ptr.write_bytes(0x5A, 2 * PAGE_SIZE);
            assert_eq!(*ptr.add(2 * PAGE_SIZE - 1), 0x5A);
            release(base, size);
        }
    }

    #[test]
    fn test_purge_zero_fills() {
        unsafe {
            let size = 2 * PAGE_SIZE;
            let ptr = reserve_aligned(size, ALIGN);
            assert!(commit(ptr, size));
            ptr.write_bytes(0xC3, size);
            assert!(purge(ptr, PAGE_SIZE));
            assert_eq!(*ptr, 0);
            assert_eq!(*ptr.add(PAGE_SIZE - 1), 0);
            // The page past the purged window keeps its contents.
            assert_eq!(*ptr.add(PAGE_SIZE), 0xC3);
            release(ptr, size);
        }
    }

    #[test]
    fn test_guard_then_recommit() {
        unsafe {
            let size = PAGE_SIZE;
            let ptr = reserve_aligned(size, ALIGN);
            assert!(commit(ptr, size));
            *ptr = 1;
            assert!(guard(ptr, size));
            assert!(commit(ptr, size));
            assert_eq!(*ptr, 0);
            release(ptr, size);
        }
    }
}
