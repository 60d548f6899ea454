//! A host that quarantines and revokes freed memory is refused at setup.

use contarena::hooks::ExtentHooks;
use contarena::{ArenaConfig, ContinuousArena, HostAllocator, HostError};
use std::ptr::{self, NonNull};

struct RevokingHost;

impl HostAllocator for RevokingHost {
    unsafe fn create_arena(&self, _hooks: NonNull<ExtentHooks>) -> Result<u32, HostError> {
        panic!("arena must not be registered with a revoking host");
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

    fn is_revoking(&self) -> bool {
        true
    }
}

static HOST: RevokingHost = RevokingHost;

#[test]
#[should_panic(expected = "revoking host")]
fn test_revoking_host_is_refused() {
    ContinuousArena::initialize_with(&HOST, ArenaConfig::with_lg_size(20));
}
