//! The general-purpose allocator the arena feeds.
//!
//! A host owns the allocation policy: it asks the arena for extents through
//! a registered [`ExtentHooks`] table and carves them up itself. The arena
//! only needs a handful of entry points from it, captured by
//! [`HostAllocator`].
//!
//! - [`DirectHost`] (`std`): a reference host that backs every allocation
//!   with its own extent. Used by the tests and the demo.
//! - [`Jemalloc`] (`jemalloc` feature): binds to a jemalloc that supports
//!   per-arena extent hooks.

use crate::error::HostError;
use crate::hooks::ExtentHooks;
use core::ptr::NonNull;

#[cfg(feature = "std")]
mod direct;
#[cfg(feature = "jemalloc")]
mod jemalloc;

#[cfg(feature = "std")]
pub use direct::DirectHost;
#[cfg(feature = "jemalloc")]
pub use jemalloc::Jemalloc;

/// Entry points a host allocator exposes to the arena.
///
/// All allocation calls go to the arena index returned by
/// [`create_arena`](Self::create_arena) and bypass any per-thread caching the
/// host does, so every block observably comes out of the arena's extents.
pub trait HostAllocator: Sync {
    /// Register a new arena whose extents come from `hooks`. The host may call
    /// into the hooks before this returns.
    ///
    /// # Safety
    ///
    /// `hooks` must stay valid and in place for as long as the host may call
    /// it, which in practice means forever.
    unsafe fn create_arena(&self, hooks: NonNull<ExtentHooks>) -> Result<u32, HostError>;

    /// Allocate `size` bytes aligned to `alignment` from arena `arena`.
    /// Returns null when the arena is exhausted.
    ///
    /// # Safety
    ///
    /// `arena` must come from `create_arena` on this host; `alignment` must
    /// be a power of two.
    unsafe fn allocate(&self, arena: u32, size: usize, alignment: usize) -> *mut u8;

    /// Resize `ptr` to `size` bytes, moving it within arena `arena` if needed.
    ///
    /// # Safety
    ///
    /// As [`allocate`](Self::allocate), and `ptr` must be null or live in
    /// this host.
    unsafe fn reallocate(&self, arena: u32, ptr: *mut u8, size: usize, alignment: usize)
    -> *mut u8;

    /// Release `ptr`. Null is ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or live in this host.
    unsafe fn free(&self, ptr: *mut u8);

    /// Whether the host quarantines and revokes freed memory. Such a host
    /// cannot route allocations to an explicit arena.
    fn is_revoking(&self) -> bool {
        false
    }
}
