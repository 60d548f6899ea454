//! The process-wide arena and its allocation entry points.
//!
//! All state lives in one module-level static; [`ContinuousArena`] is a
//! zero-sized handle onto it, so it can be named in a `#[global_allocator]`
//! item or passed around freely.
//!
//! Setup is one-shot and walks a small state machine:
//!
//! ```text
//! UNINIT --initialize--> RESERVING --reserve--> RESERVED --register--> READY
//! ```
//!
//! The arena and its hook table are written before registration starts,
//! because the host grows its first extent from inside the registration call.
//! Every explicit pass-through requires `READY`; the `GlobalAlloc` impl
//! falls back to the system heap until then.
//!
//! # Usage
//!
//! ```ignore
//! static HOST: contarena::host::Jemalloc = contarena::host::Jemalloc;
//!
//! contarena::ContinuousArena::initialize(&HOST);
//! contarena::ContinuousArena::initialize_per_thread();
//! let p = contarena::ContinuousArena::allocate_aligned(64, 1000);
//! ```

use crate::arena::{Arena, ArenaConfig};
use crate::capability::{Capability, CapabilityMode, DefaultCapability};
use crate::hooks::HookTable;
use crate::host::HostAllocator;
use crate::{arena_log, check};
use core::alloc::{GlobalAlloc, Layout};
use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

const UNINIT: u8 = 0;
const RESERVING: u8 = 1;
const RESERVED: u8 = 2;
const READY: u8 = 3;

struct Global {
    state: AtomicU8,
    index: AtomicU32,
    // Written once while `state` is RESERVING, read-only afterwards.
    arena: UnsafeCell<MaybeUninit<Arena>>,
    hooks: UnsafeCell<MaybeUninit<HookTable<'static, DefaultCapability>>>,
    host: UnsafeCell<MaybeUninit<&'static dyn HostAllocator>>,
}

// SAFETY: the cells are written by the single thread that won the
// UNINIT -> RESERVING transition and published with a Release store.
unsafe impl Sync for Global {}

static GLOBAL: Global = Global {
    state: AtomicU8::new(UNINIT),
    index: AtomicU32::new(0),
    arena: UnsafeCell::new(MaybeUninit::uninit()),
    hooks: UnsafeCell::new(MaybeUninit::uninit()),
    host: UnsafeCell::new(MaybeUninit::uninit()),
};

#[derive(Clone, Copy)]
struct Ready {
    arena: &'static Arena,
    host: &'static dyn HostAllocator,
    index: u32,
}

#[inline]
fn ready() -> Ready {
    if GLOBAL.state.load(Ordering::Acquire) != READY {
        panic!("contarena: arena used before initialize()");
    }
    // SAFETY: READY is only stored after all three cells are written.
    unsafe {
        Ready {
            arena: (*GLOBAL.arena.get()).assume_init_ref(),
            host: *(*GLOBAL.host.get()).assume_init_ref(),
            index: GLOBAL.index.load(Ordering::Relaxed),
        }
    }
}

/// Check a block handed back by the host against the capability rules.
fn verify_block(arena: &Arena, p: *mut u8, size: usize, alignment: usize) {
    if p.is_null() {
        return;
    }
    let v = arena.validation();
    let addr = p as usize;
    check!(
        v,
        addr & alignment.wrapping_sub(1) == 0,
        "host returned {:p}, not aligned to {}",
        p,
        alignment
    );

    let cap = arena.capability();
    let len = match cap.mode() {
        CapabilityMode::None => return,
        CapabilityMode::Hybrid => size,
        CapabilityMode::PureCapability => cap.representable_length(size).unwrap_or(usize::MAX),
    };
    let bounds = cap.ambient();
    check!(
        v,
        bounds.is_some_and(|b| b.contains_range(addr, len)),
        "block {:p}+{:#x} escapes the ambient bounds {:?}",
        p,
        len,
        bounds
    );
}

/// Handle to the process-wide continuous arena.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContinuousArena;

impl ContinuousArena {
    /// Reserve the arena with the build-time layout and register it with
    /// `host`.
    ///
    /// # Panics
    ///
    /// On a second call, when `host` is revoking, when the reservation fails,
    /// or when `host` refuses the arena. None of these are recoverable.
    pub fn initialize(host: &'static dyn HostAllocator) {
        Self::initialize_with(host, ArenaConfig::default());
    }

    /// [`initialize`](Self::initialize) with an explicit layout.
    pub fn initialize_with(host: &'static dyn HostAllocator, config: ArenaConfig) {
        if GLOBAL
            .state
            .compare_exchange(UNINIT, RESERVING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            panic!("contarena: initialize() called more than once");
        }
        if host.is_revoking() {
            panic!("contarena: a revoking host cannot pin allocations to one arena");
        }

        let arena = match Arena::reserve(config) {
            Ok(arena) => arena,
            Err(e) => panic!("contarena: {e}"),
        };

        // SAFETY: winning the transition above makes this thread the only writer.
        let hooks = unsafe {
            let arena: &'static Arena = (*GLOBAL.arena.get()).write(arena);
            (*GLOBAL.host.get()).write(host);
            &*(*GLOBAL.hooks.get()).write(HookTable::new(arena))
        };
        GLOBAL.state.store(RESERVED, Ordering::Release);

        let index = match unsafe { host.create_arena(hooks.as_ptr()) } {
            Ok(index) => index,
            Err(e) => panic!("contarena: {e}"),
        };
        GLOBAL.index.store(index, Ordering::Relaxed);
        GLOBAL.state.store(READY, Ordering::Release);

        arena_log!("initialized arena {} over {:?}", index, hooks.arena().region());
    }

    /// Whether [`initialize`](Self::initialize) has completed.
    pub fn is_initialized() -> bool {
        GLOBAL.state.load(Ordering::Acquire) == READY
    }

    /// Bind the calling thread's ambient bounds to the arena's region. A
    /// no-op without a capability model.
    ///
    /// # Panics
    ///
    /// Before [`initialize`](Self::initialize).
    pub fn initialize_per_thread() {
        let arena = ready().arena;
        arena.capability().bind_ambient(arena.region());
    }

    /// The underlying arena.
    pub fn arena() -> &'static Arena {
        ready().arena
    }

    /// The host's index for this arena.
    pub fn arena_index() -> u32 {
        ready().index
    }

    /// Allocate `size` bytes aligned to `alignment` from the arena. Null when
    /// it is exhausted.
    pub fn allocate_aligned(alignment: usize, size: usize) -> *mut u8 {
        let g = ready();
        check!(
            g.arena.validation(),
            alignment.is_power_of_two(),
            "alignment {} is not a power of two",
            alignment
        );
        let p = unsafe { g.host.allocate(g.index, size, alignment) };
        verify_block(g.arena, p, size, alignment);
        p
    }

    /// Resize `ptr` to `size` bytes with no alignment requirement beyond the
    /// host's own.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this arena.
    pub unsafe fn reallocate(ptr: *mut u8, size: usize) -> *mut u8 {
        unsafe { Self::reallocate_aligned(ptr, size, 1) }
    }

    /// Resize `ptr` to `size` bytes aligned to `alignment`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this arena.
    pub unsafe fn reallocate_aligned(ptr: *mut u8, size: usize, alignment: usize) -> *mut u8 {
        let g = ready();
        check!(
            g.arena.validation(),
            alignment.is_power_of_two(),
            "alignment {} is not a power of two",
            alignment
        );
        let p = unsafe { g.host.reallocate(g.index, ptr, size, alignment) };
        verify_block(g.arena, p, size, alignment);
        p
    }

    /// Return `ptr` to the host. Null is ignored.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live block from this arena.
    pub unsafe fn free(ptr: *mut u8) {
        let g = ready();
        unsafe { g.host.free(ptr) }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::alloc::System as Fallback;
    } else {
        /// Without `std` there is no heap to fall back to.
        struct Fallback;

        unsafe impl GlobalAlloc for Fallback {
            unsafe fn alloc(&self, _layout: Layout) -> *mut u8 {
                core::ptr::null_mut()
            }

            unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {}
        }
    }
}

/// Whether `ptr` was handed out by the arena rather than the fallback heap.
#[inline]
fn owns(ptr: *mut u8) -> bool {
    ContinuousArena::is_initialized() && ready().arena.region().contains(ptr as usize)
}

/// Blocks requested before [`ContinuousArena::initialize`] completes come
/// from the system heap (`std`) or fail (`no_std`), so the handle can be
/// installed as `#[global_allocator]` ahead of setup. Frees and reallocs are
/// routed by address: blocks outside the arena's region stay with the
/// fallback heap for their whole life.
unsafe impl GlobalAlloc for ContinuousArena {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.size() == 0 {
            return layout.align() as *mut u8;
        }
        if !Self::is_initialized() {
            return unsafe { Fallback.alloc(layout) };
        }
        Self::allocate_aligned(layout.align(), layout.size())
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        if owns(ptr) {
            unsafe { Self::free(ptr) }
        } else {
            unsafe { Fallback.dealloc(ptr, layout) }
        }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.size() == 0 {
            let new_layout = unsafe { Layout::from_size_align_unchecked(new_size, layout.align()) };
            return unsafe { self.alloc(new_layout) };
        }
        if new_size == 0 {
            unsafe { self.dealloc(ptr, layout) };
            return layout.align() as *mut u8;
        }
        if owns(ptr) {
            unsafe { Self::reallocate_aligned(ptr, new_size, layout.align()) }
        } else {
            unsafe { Fallback.realloc(ptr, layout, new_size) }
        }
    }
}
