#![no_std]
#![cfg_attr(feature = "nightly", feature(thread_local))]

//! contarena: a continuous, monotonically grown extent arena.
//!
//! One aligned span of address space is reserved up front and handed to a
//! host allocator as its only source of extents:
//! - Extents are carved off a bump pointer and never reused
//! - Destroyed extents become inaccessible guard pages
//! - Purged pages are replaced with fresh zero pages in place
//! - On capability hardware, every extent is widened to be exactly
//!   representable, and each thread's ambient bounds cover the whole arena
//!
//! # Usage
//!
//! ```ignore
//! static HOST: contarena::host::Jemalloc = contarena::host::Jemalloc;
//!
//! #[global_allocator]
//! static GLOBAL: contarena::ContinuousArena = contarena::ContinuousArena;
//!
//! fn main() {
//!     // Allocations made before this point come from the system heap.
//!     contarena::ContinuousArena::initialize(&HOST);
//!     contarena::ContinuousArena::initialize_per_thread();
//! }
//! ```
//!
//! The host must not allocate through the global allocator itself, so
//! [`host::DirectHost`] (which keeps its bookkeeping on the heap) only backs
//! explicit use of the handle.

#[cfg(test)]
extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

mod macros;

pub mod arena;
pub mod capability;
pub mod config;
pub mod error;
#[cfg(feature = "ffi")]
pub mod ffi;
pub mod global;
pub mod hooks;
pub mod host;
pub mod platform;
pub mod region;
#[cfg(feature = "stats")]
pub mod stats;
pub mod sync;
pub mod validate;

pub use arena::{Arena, ArenaConfig, PurgeKind};
pub use config::{AREA_SIZE, LG_AREA_SIZE, PAGE_SIZE};
pub use error::{ArenaError, HostError};
pub use global::ContinuousArena;
pub use host::HostAllocator;
pub use region::Region;

// Panic handler for staticlib builds (no_std has no default panic handler).
// Only active when panic="abort" (i.e., the `fast` profile), not during normal checks.
#[cfg(all(feature = "ffi", not(test), not(feature = "std"), panic = "abort"))]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    unsafe { libc::abort() }
}
