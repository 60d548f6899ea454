//! A host that refuses the arena leaves the process unusable.

use contarena::hooks::ExtentHooks;
use contarena::{ArenaConfig, ContinuousArena, HostAllocator, HostError};
use std::ptr::{self, NonNull};

struct FullHost;

impl HostAllocator for FullHost {
    unsafe fn create_arena(&self, _hooks: NonNull<ExtentHooks>) -> Result<u32, HostError> {
        Err(HostError::TooManyArenas)
    }

    unsafe fn allocate(&self, _arena: u32, _size: usize, _alignment: usize) -> *mut u8 {
        ptr::null_mut()
    }

    unsafe fn reallocate(
        &self,
        _arena: u32,
        _ptr: *mut u8,
        _size: usize,
        _alignment: usize,
    ) -> *mut u8 {
        ptr::null_mut()
    }

    unsafe fn free(&self, _ptr: *mut u8) {}
}

static HOST: FullHost = FullHost;

#[test]
#[should_panic(expected = "no free arena slots")]
fn test_registration_failure_panics() {
    ContinuousArena::initialize_with(&HOST, ArenaConfig::with_lg_size(20));
}
