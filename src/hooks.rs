//! Extent hook table handed to the host allocator.
//!
//! [`ExtentHooks`] matches the host's C layout: nine optional callbacks in a
//! fixed order. This arena fills in four of them:
//!
//! | slot           | behaviour                                          |
//! |----------------|----------------------------------------------------|
//! | `alloc`        | [`Arena::grow`]                                    |
//! | `destroy`      | [`Arena::destroy`]                                 |
//! | `purge_lazy`   | [`Arena::purge`], always purged eagerly            |
//! | `purge_forced` | [`Arena::purge`]                                   |
//!
//! `dalloc`, `commit`, `decommit`, `split` and `merge` are left null. A null
//! `dalloc` tells the host to keep extents it is done with rather than hand
//! them back for reuse; null `split` and `merge` forbid it from reshaping
//! extents, and null `commit`/`decommit` leave every extent committed for its
//! whole life. A host configured to call them anyway is misconfigured.
//!
//! The host passes the table pointer back into every callback. [`HookTable`]
//! places the table first in a `#[repr(C)]` struct next to the arena it
//! serves, so the callbacks recover their arena from that pointer alone.

use crate::arena::{Arena, PurgeKind};
use crate::capability::Capability;
use core::ffi::{c_uint, c_void};
use core::ptr::NonNull;

pub type ExtentAllocFn = unsafe extern "C" fn(
    extent_hooks: *mut ExtentHooks,
    new_addr: *mut c_void,
    size: usize,
    alignment: usize,
    zero: *mut bool,
    commit: *mut bool,
    arena_ind: c_uint,
) -> *mut c_void;

pub type ExtentDallocFn = unsafe extern "C" fn(
    extent_hooks: *mut ExtentHooks,
    addr: *mut c_void,
    size: usize,
    committed: bool,
    arena_ind: c_uint,
) -> bool;

pub type ExtentDestroyFn = unsafe extern "C" fn(
    extent_hooks: *mut ExtentHooks,
    addr: *mut c_void,
    size: usize,
    committed: bool,
    arena_ind: c_uint,
);

/// Shared by `commit`, `decommit`, `purge_lazy` and `purge_forced`.
pub type ExtentRangeFn = unsafe extern "C" fn(
    extent_hooks: *mut ExtentHooks,
    addr: *mut c_void,
    size: usize,
    offset: usize,
    length: usize,
    arena_ind: c_uint,
) -> bool;

pub type ExtentSplitFn = unsafe extern "C" fn(
    extent_hooks: *mut ExtentHooks,
    addr: *mut c_void,
    size: usize,
    size_a: usize,
    size_b: usize,
    committed: bool,
    arena_ind: c_uint,
) -> bool;

pub type ExtentMergeFn = unsafe extern "C" fn(
    extent_hooks: *mut ExtentHooks,
    addr_a: *mut c_void,
    size_a: usize,
    addr_b: *mut c_void,
    size_b: usize,
    committed: bool,
    arena_ind: c_uint,
) -> bool;

/// The host allocator's extent hook table. `None` opts out of a callback.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct ExtentHooks {
    pub alloc: Option<ExtentAllocFn>,
    pub dalloc: Option<ExtentDallocFn>,
    pub destroy: Option<ExtentDestroyFn>,
    pub commit: Option<ExtentRangeFn>,
    pub decommit: Option<ExtentRangeFn>,
    pub purge_lazy: Option<ExtentRangeFn>,
    pub purge_forced: Option<ExtentRangeFn>,
    pub split: Option<ExtentSplitFn>,
    pub merge: Option<ExtentMergeFn>,
}

/// A hook table bound to one arena.
#[repr(C)]
pub struct HookTable<'a, C: Capability> {
    // Must stay the first field: callbacks cast the table pointer back to `Self`.
    hooks: ExtentHooks,
    arena: &'a Arena<C>,
}

// SAFETY: the table is immutable after construction and the arena is Sync.
unsafe impl<C: Capability> Sync for HookTable<'_, C> {}
unsafe impl<C: Capability> Send for HookTable<'_, C> {}

impl<'a, C: Capability> HookTable<'a, C> {
    pub fn new(arena: &'a Arena<C>) -> Self {
        Self {
            hooks: ExtentHooks {
                alloc: Some(extent_alloc::<C>),
                dalloc: None,
                destroy: Some(extent_destroy::<C>),
                commit: None,
                decommit: None,
                purge_lazy: Some(extent_purge_lazy::<C>),
                purge_forced: Some(extent_purge_forced::<C>),
                split: None,
                merge: None,
            },
            arena,
        }
    }

    #[inline]
    pub fn arena(&self) -> &'a Arena<C> {
        self.arena
    }

    #[inline]
    pub fn hooks(&self) -> &ExtentHooks {
        &self.hooks
    }

    /// The pointer to register with the host. Valid for as long as `self`
    /// stays in place.
    #[inline]
    pub fn as_ptr(&self) -> NonNull<ExtentHooks> {
        NonNull::from(&self.hooks)
    }
}

/// # Safety
/// `hooks` must point at the `hooks` field of a live `HookTable<'a, C>`.
#[inline]
unsafe fn arena_of<'a, C: Capability>(hooks: *mut ExtentHooks) -> &'a Arena<C> {
    unsafe { (*hooks.cast::<HookTable<'a, C>>()).arena }
}

unsafe extern "C" fn extent_alloc<C: Capability>(
    extent_hooks: *mut ExtentHooks,
    new_addr: *mut c_void,
    size: usize,
    alignment: usize,
    zero: *mut bool,
    commit: *mut bool,
    _arena_ind: c_uint,
) -> *mut c_void {
    let arena = unsafe { arena_of::<C>(extent_hooks) };
    let (zero, commit) = unsafe { (&mut *zero, &mut *commit) };
    arena
        .grow(new_addr.cast(), size, alignment, zero, commit)
        .cast()
}

unsafe extern "C" fn extent_destroy<C: Capability>(
    extent_hooks: *mut ExtentHooks,
    addr: *mut c_void,
    size: usize,
    committed: bool,
    _arena_ind: c_uint,
) {
    let arena = unsafe { arena_of::<C>(extent_hooks) };
    arena.destroy(addr.cast(), size, committed);
}

unsafe extern "C" fn extent_purge_lazy<C: Capability>(
    extent_hooks: *mut ExtentHooks,
    addr: *mut c_void,
    size: usize,
    offset: usize,
    length: usize,
    _arena_ind: c_uint,
) -> bool {
    let arena = unsafe { arena_of::<C>(extent_hooks) };
    arena.purge(PurgeKind::Lazy, addr.cast(), size, offset, length)
}

unsafe extern "C" fn extent_purge_forced<C: Capability>(
    extent_hooks: *mut ExtentHooks,
    addr: *mut c_void,
    size: usize,
    offset: usize,
    length: usize,
    _arena_ind: c_uint,
) -> bool {
    let arena = unsafe { arena_of::<C>(extent_hooks) };
    arena.purge(PurgeKind::Forced, addr.cast(), size, offset, length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaConfig;
    use crate::capability::NoCapability;
    use crate::config::PAGE_SIZE;
    use crate::validate::Validation;
    use core::ptr;

    fn arena() -> Arena<NoCapability> {
        Arena::reserve_with(ArenaConfig::with_lg_size(22), NoCapability, Validation::Enabled)
            .unwrap()
    }

    #[test]
    fn test_opt_outs_are_null() {
        let a = arena();
        let table = HookTable::new(&a);
        let h = table.hooks();
        assert!(h.alloc.is_some());
        assert!(h.destroy.is_some());
        assert!(h.purge_lazy.is_some());
        assert!(h.purge_forced.is_some());
        assert!(h.dalloc.is_none());
        assert!(h.commit.is_none());
        assert!(h.decommit.is_none());
        assert!(h.split.is_none());
        assert!(h.merge.is_none());
    }

    #[test]
    fn test_layout_matches_c() {
        use core::mem::{offset_of, size_of};
        let slot = size_of::<Option<ExtentAllocFn>>();
        assert_eq!(slot, size_of::<*const c_void>());
        assert_eq!(size_of::<ExtentHooks>(), 9 * slot);
        assert_eq!(offset_of!(ExtentHooks, destroy), 2 * slot);
        assert_eq!(offset_of!(ExtentHooks, purge_forced), 6 * slot);
        assert_eq!(offset_of!(ExtentHooks, merge), 8 * slot);
        assert_eq!(offset_of!(HookTable<'static, NoCapability>, hooks), 0);
    }

    #[test]
    fn test_callbacks_reach_the_arena() {
        let a = arena();
        let table = HookTable::new(&a);
        let hooks = table.as_ptr().as_ptr();
        let (mut zero, mut commit) = (false, false);
        unsafe {
            let alloc = (*hooks).alloc.unwrap();
            let p = alloc(hooks, ptr::null_mut(), PAGE_SIZE, PAGE_SIZE, &mut zero, &mut commit, 7);
            assert!(!p.is_null());
            assert!(zero && commit);
            assert_eq!(p as usize, a.region().start);

            p.cast::<u8>().write_bytes(0x3C, PAGE_SIZE);
            let purge = (*hooks).purge_forced.unwrap();
            assert!(!purge(hooks, p, PAGE_SIZE, 0, PAGE_SIZE, 7));
            assert_eq!(*p.cast::<u8>(), 0);

            let destroy = (*hooks).destroy.unwrap();
            destroy(hooks, p, PAGE_SIZE, true, 7);
        }
        assert_eq!(a.current(), a.region().start + PAGE_SIZE);
    }
}
