//! Windows implementation using VirtualAlloc/VirtualFree.
//!
//! Reservation and commitment are separate states here, so guard means
//! `MEM_DECOMMIT` and purge is a decommit followed by a fresh commit.

use core::ffi::c_void;
use core::ptr;

const MEM_COMMIT: u32 = 0x1000;
const MEM_RESERVE: u32 = 0x2000;
const MEM_DECOMMIT: u32 = 0x4000;
const MEM_RELEASE: u32 = 0x8000;
const PAGE_NOACCESS: u32 = 0x01;
const PAGE_READWRITE: u32 = 0x04;

/// Another thread can grab the aligned hole between our release and re-reserve.
const RESERVE_ATTEMPTS: usize = 8;

unsafe extern "system" {
    #[link_name = "VirtualAlloc"]
    fn virtual_alloc(
        lp_address: *mut c_void,
        dw_size: usize,
        fl_allocation_type: u32,
        fl_protect: u32,
    ) -> *mut c_void;

    #[link_name = "VirtualFree"]
    fn virtual_free(lp_address: *mut c_void, dw_size: usize, dw_free_type: u32) -> i32;
}

pub unsafe fn reserve_aligned(size: usize, align: usize) -> *mut u8 {
    let Some(padded) = size.checked_add(align) else {
        return ptr::null_mut();
    };
    for _ in 0..RESERVE_ATTEMPTS {
        // Find an aligned hole, give it back, then claim exactly the aligned part.
        let trial = unsafe { virtual_alloc(ptr::null_mut(), padded, MEM_RESERVE, PAGE_NOACCESS) };
        if trial.is_null() {
            return ptr::null_mut();
        }
        let start = (trial as usize + align - 1) & !(align - 1);
        unsafe { virtual_free(trial, 0, MEM_RELEASE) };

        let ptr = unsafe { virtual_alloc(start as *mut c_void, size, MEM_RESERVE, PAGE_NOACCESS) };
        if !ptr.is_null() {
            return ptr as *mut u8;
        }
    }
    ptr::null_mut()
}

pub unsafe fn release(ptr: *mut u8, _size: usize) {
    // MEM_RELEASE requires dwSize = 0 (releases the entire reservation)
    unsafe { virtual_free(ptr as *mut c_void, 0, MEM_RELEASE) };
}

pub unsafe fn commit(ptr: *mut u8, size: usize) -> bool {
    let ret = unsafe { virtual_alloc(ptr as *mut c_void, size, MEM_COMMIT, PAGE_READWRITE) };
    ret as *mut u8 == ptr
}

pub unsafe fn guard(ptr: *mut u8, size: usize) -> bool {
    unsafe { virtual_free(ptr as *mut c_void, size, MEM_DECOMMIT) != 0 }
}

pub unsafe fn purge(ptr: *mut u8, size: usize) -> bool {
    unsafe { guard(ptr, size) && commit(ptr, size) }
}
