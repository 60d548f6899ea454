//! Reference host: one extent per allocation.
//!
//! Every allocation calls the grow hook for an extent of its own and every
//! free destroys it, so arena behaviour is visible one call at a time. Like
//! jemalloc, registering an arena immediately grows a base block for the
//! host's own metadata; that block is never released.

use super::HostAllocator;
use crate::arena::PurgeKind;
use crate::config::PAGE_SIZE;
use crate::error::HostError;
use crate::hooks::ExtentHooks;
use crate::sync::SpinMutex;
use core::ffi::c_uint;
use core::ptr::{self, NonNull};
use std::collections::BTreeMap;
use std::vec::Vec;

/// Bytes grown for each arena's metadata block at registration.
pub const BASE_BLOCK_SIZE: usize = PAGE_SIZE;

#[derive(Clone, Copy)]
struct HooksPtr(NonNull<ExtentHooks>);

// SAFETY: the hooks table is immutable and its callbacks are thread-safe.
unsafe impl Send for HooksPtr {}

#[derive(Clone, Copy)]
struct Live {
    arena: u32,
    size: usize,
}

struct Inner {
    arenas: Vec<HooksPtr>,
    live: BTreeMap<usize, Live>,
}

/// A host that allocates each block as a dedicated extent.
pub struct DirectHost {
    inner: SpinMutex<Inner>,
}

impl Default for DirectHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectHost {
    pub const fn new() -> Self {
        Self {
            inner: SpinMutex::new(Inner {
                arenas: Vec::new(),
                live: BTreeMap::new(),
            }),
        }
    }

    /// Number of arenas registered so far.
    pub fn arena_count(&self) -> usize {
        self.inner.lock().arenas.len()
    }

    /// Number of allocations not yet freed.
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Requested size of the live allocation at `ptr`.
    pub fn size_of(&self, ptr: *const u8) -> Option<usize> {
        self.inner.lock().live.get(&(ptr as usize)).map(|l| l.size)
    }

    /// Hand the whole extent behind `ptr` to the matching purge hook. Returns
    /// the hook's result: `false` when the pages were purged.
    ///
    /// # Safety
    ///
    /// `ptr` must be live in this host. Its contents are discarded.
    pub unsafe fn purge(&self, ptr: *mut u8, kind: PurgeKind) -> bool {
        let (hooks, live) = {
            let inner = self.inner.lock();
            let live = match inner.live.get(&(ptr as usize)) {
                Some(l) => *l,
                None => panic!("DirectHost: purge of unknown pointer {ptr:p}"),
            };
            (inner.arenas[live.arena as usize], live)
        };
        let hooks = hooks.0.as_ptr();
        let slot = match kind {
            PurgeKind::Lazy => unsafe { (*hooks).purge_lazy },
            PurgeKind::Forced => unsafe { (*hooks).purge_forced },
        };
        // Purge windows are whole pages; every extent here spans whole pages.
        let span = (live.size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
        match slot {
            Some(purge) => unsafe { purge(hooks, ptr.cast(), span, 0, span, live.arena) },
            // An opted-out purge leaves the pages alone.
            None => true,
        }
    }

    fn hooks_for(&self, arena: u32) -> HooksPtr {
        let inner = self.inner.lock();
        match inner.arenas.get(arena as usize) {
            Some(h) => *h,
            None => panic!("DirectHost: unknown arena {arena}"),
        }
    }

    /// Call the grow hook directly.
    unsafe fn grow(hooks: HooksPtr, arena: u32, size: usize, alignment: usize) -> *mut u8 {
        let hooks = hooks.0.as_ptr();
        let Some(alloc) = (unsafe { (*hooks).alloc }) else {
            return ptr::null_mut();
        };
        let (mut zero, mut commit) = (false, false);
        let p = unsafe {
            alloc(
                hooks,
                ptr::null_mut(),
                size,
                alignment,
                &mut zero,
                &mut commit,
                arena as c_uint,
            )
        };
        debug_assert!(p.is_null() || commit, "grow hook returned an uncommitted extent");
        p.cast()
    }
}

impl HostAllocator for DirectHost {
    unsafe fn create_arena(&self, hooks: NonNull<ExtentHooks>) -> Result<u32, HostError> {
        let hooks = HooksPtr(hooks);
        let mut inner = self.inner.lock();
        let index = u32::try_from(inner.arenas.len()).map_err(|_| HostError::TooManyArenas)?;

        let base = unsafe { Self::grow(hooks, index, BASE_BLOCK_SIZE, PAGE_SIZE) };
        if base.is_null() {
            return Err(HostError::CreateFailed {
                code: libc::ENOMEM,
            });
        }
        inner.arenas.push(hooks);
        Ok(index)
    }

    unsafe fn allocate(&self, arena: u32, size: usize, alignment: usize) -> *mut u8 {
        let hooks = self.hooks_for(arena);
        let size = size.max(1);
        let p = unsafe { Self::grow(hooks, arena, size, alignment) };
        if !p.is_null() {
            self.inner.lock().live.insert(p as usize, Live { arena, size });
        }
        p
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
        let old = match self.size_of(ptr) {
            Some(old) => old,
            None => panic!("DirectHost: realloc of unknown pointer {ptr:p}"),
        };
        if size <= old && (ptr as usize) & (alignment - 1) == 0 {
            return ptr;
        }

        let new = unsafe { self.allocate(arena, size, alignment) };
        if !new.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(ptr, new, old.min(size));
                self.free(ptr);
            }
        }
        new
    }

    unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let (hooks, live) = {
            let mut inner = self.inner.lock();
            let live = match inner.live.remove(&(ptr as usize)) {
                Some(l) => l,
                None => panic!("DirectHost: free of unknown pointer {ptr:p}"),
            };
            (inner.arenas[live.arena as usize], live)
        };
        let hooks = hooks.0.as_ptr();
        if let Some(destroy) = unsafe { (*hooks).destroy } {
            unsafe { destroy(hooks, ptr.cast(), live.size, true, live.arena) };
        }
    }
}
