//! The continuous arena: one reserved span of address space, grown
//! monotonically by a bump pointer.
//!
//! ```text
//!  start                      current                          end
//!    |<----- grown (extents) ---->|<------- available tail ------->|
//! ```
//!
//! Extents are carved off the tail at `current` and never handed out twice:
//! destroying an extent turns it back into an inaccessible guard but leaves
//! `current` where it is. Reused addresses would need their stale
//! capabilities revoked first; never reusing them sidesteps that.
//!
//! All extent operations run under one lock. They are rare (each grown extent
//! serves many allocations inside the host), so a single coarse lock costs
//! nothing measurable.

use crate::capability::{Capability, DefaultCapability};
use crate::config::{AREA_SIZE, LG_AREA_SIZE, PAGE_SIZE};
use crate::error::ArenaError;
use crate::platform;
use crate::region::Region;
use crate::sync::{SpinMutex, SpinMutexGuard};
use crate::validate::Validation;
use crate::{arena_log, check, stat_add, stat_inc};
use core::ptr;

/// Smallest and largest reservation alignment accepted at runtime.
const MIN_LG_AREA_SIZE: u32 = 16;
const MAX_LG_AREA_SIZE: u32 = if usize::BITS == 64 { 47 } else { 30 };

#[inline]
const fn align_up(addr: usize, align: usize) -> Option<usize> {
    match addr.checked_add(align - 1) {
        Some(v) => Some(v & !(align - 1)),
        None => None,
    }
}

/// Layout of an arena's reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// The reservation is aligned to `2^lg_area_size` bytes.
    pub lg_area_size: u32,
    /// Bytes of address space to reserve.
    pub area_size: usize,
}

impl ArenaConfig {
    /// A reservation of exactly `2^lg_area_size` bytes, aligned to its size.
    pub const fn with_lg_size(lg_area_size: u32) -> Self {
        Self {
            lg_area_size,
            area_size: 1 << lg_area_size,
        }
    }

    pub const fn area_align(&self) -> usize {
        1 << self.lg_area_size
    }

    pub fn validate(&self) -> Result<(), ArenaError> {
        let invalid = |reason| Err(ArenaError::InvalidConfig { reason });
        if !(MIN_LG_AREA_SIZE..=MAX_LG_AREA_SIZE).contains(&self.lg_area_size) {
            return invalid("lg_area_size out of range");
        }
        if self.area_size == 0 {
            return invalid("area_size is zero");
        }
        if self.area_size % PAGE_SIZE != 0 {
            return invalid("area_size is not a multiple of the page size");
        }
        if self.area_size > self.area_align() {
            return invalid("area_size exceeds 2^lg_area_size");
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    /// The layout from `contarena.toml`.
    fn default() -> Self {
        Self {
            lg_area_size: LG_AREA_SIZE,
            area_size: AREA_SIZE,
        }
    }
}

/// Which purge hook the host called. Both reclaim eagerly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PurgeKind {
    Lazy,
    Forced,
}

/// The mutable part of an arena. Only reachable through [`Arena::lock`], so
/// holding one proves the arena lock is held.
#[derive(Debug)]
pub struct ArenaState {
    start: usize,
    end: usize,
    current: usize,
}

impl ArenaState {
    const fn new(region: Region) -> Self {
        Self {
            start: region.start,
            end: region.end,
            current: region.start,
        }
    }

    /// The bump pointer: everything below it has been handed out at some point.
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// Bytes left in the tail.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.end - self.current
    }

    /// `[addr, addr + size)` does not wrap and lies within the reservation.
    pub fn is_valid_range(&self, addr: usize, size: usize) -> bool {
        debug_assert!(self.start <= self.current && self.current <= self.end);
        Region::new(self.start, self.end).contains_range(addr, size)
    }

    /// Valid, and entirely below the bump pointer.
    pub fn is_allocated_range(&self, addr: usize, size: usize) -> bool {
        self.is_valid_range(addr, size) && addr + size <= self.current
    }

    /// Valid, and entirely in the not-yet-grown tail.
    pub fn is_available_range(&self, addr: usize, size: usize) -> bool {
        self.is_valid_range(addr, size) && addr >= self.current
    }
}

/// A continuous arena over one reservation.
///
/// A standalone `Arena` releases its reservation when dropped. The
/// process-wide arena behind [`crate::ContinuousArena`] is never dropped.
pub struct Arena<C: Capability = DefaultCapability> {
    region: Region,
    state: SpinMutex<ArenaState>,
    capability: C,
    validation: Validation,
}

impl Arena<DefaultCapability> {
    /// Reserve an arena with the build's capability model and default
    /// validation mode.
    pub fn reserve(config: ArenaConfig) -> Result<Self, ArenaError> {
        Self::reserve_with(config, DefaultCapability::default(), Validation::default())
    }
}

impl<C: Capability> Arena<C> {
    /// Reserve `config.area_size` bytes aligned to `2^config.lg_area_size`.
    /// Nothing is committed until the first grow.
    pub fn reserve_with(
        config: ArenaConfig,
        capability: C,
        validation: Validation,
    ) -> Result<Self, ArenaError> {
        config.validate()?;
        let size = config.area_size;
        let align = config.area_align();

        let base = unsafe { platform::reserve_aligned(size, align) };
        if base.is_null() {
            return Err(ArenaError::ReserveFailed { size, align });
        }

        arena_log!("reserved {} bytes starting from {:p}", size, base);

        let region = Region::new(base as usize, base as usize + size);
        Ok(Self {
            region,
            state: SpinMutex::new(ArenaState::new(region)),
            capability,
            validation,
        })
    }

    #[inline]
    pub fn region(&self) -> Region {
        self.region
    }

    #[inline]
    pub fn capability(&self) -> &C {
        &self.capability
    }

    #[inline]
    pub fn validation(&self) -> Validation {
        self.validation
    }

    /// Take the arena lock. The range queries live on the guarded state.
    #[inline]
    pub fn lock(&self) -> SpinMutexGuard<'_, ArenaState> {
        self.state.lock()
    }

    /// A snapshot of the bump pointer.
    pub fn current(&self) -> usize {
        self.lock().current
    }

    /// Grow hook: carve a new extent off the tail.
    ///
    /// Returns null when `new_addr` is non-null (this arena only grows at its
    /// own bump pointer), when `size` is zero, or when the tail cannot fit the
    /// widened extent. On success `*zero` and `*commit` are set: the extent is
    /// fresh, zero-filled and backed.
    pub fn grow(
        &self,
        new_addr: *mut u8,
        size: usize,
        alignment: usize,
        zero: &mut bool,
        commit: &mut bool,
    ) -> *mut u8 {
        stat_inc!(grow_calls);
        let mut state = self.state.lock();

        let ret = if !new_addr.is_null() || size == 0 {
            ptr::null_mut()
        } else {
            self.grow_locked(&mut state, size, alignment, zero, commit)
        };

        if ret.is_null() {
            stat_inc!(grow_failures);
        }
        arena_log!(
            "alloc({:p}, {}, {}, {}, {}) = {:p}",
            new_addr,
            size,
            alignment,
            *zero,
            *commit,
            ret
        );
        ret
    }

    fn grow_locked(
        &self,
        state: &mut ArenaState,
        size: usize,
        alignment: usize,
        zero: &mut bool,
        commit: &mut bool,
    ) -> *mut u8 {
        let v = self.validation;
        check!(
            v,
            alignment.is_power_of_two(),
            "extent alignment {alignment:#x} is not a power of two"
        );

        let Some(widened) = self.capability.widen(size, alignment) else {
            return ptr::null_mut();
        };
        check!(
            v,
            widened.size >= size,
            "representable size {} is smaller than requested {}",
            widened.size,
            size
        );
        check!(
            v,
            widened.alignment.is_power_of_two() && widened.alignment >= alignment,
            "representable alignment {:#x} does not cover requested {:#x}",
            widened.alignment,
            alignment
        );

        // Align up, never down: below `current` is already handed out. The
        // OS maps whole pages, so extents start and end on page boundaries.
        let Some(start) = align_up(state.current, widened.alignment.max(PAGE_SIZE)) else {
            return ptr::null_mut();
        };
        let Some(span) = align_up(widened.size, PAGE_SIZE) else {
            return ptr::null_mut();
        };
        if !state.is_available_range(start, span) {
            return ptr::null_mut();
        }

        if !unsafe { platform::commit(start as *mut u8, span) } {
            return ptr::null_mut();
        }

        if self.capability.mode().is_pure() {
            let mask = self.capability.representable_alignment_mask(widened.size);
            check!(
                v,
                start & !mask == 0
                    && self.capability.representable_length(widened.size) == Some(widened.size),
                "extent {start:#x}+{:#x} is not exactly representable",
                widened.size
            );
        }

        stat_inc!(grow_count);
        stat_add!(grow_bytes, span);
        stat_add!(alignment_padding, start - state.current);

        *zero = true;
        *commit = true;
        state.current = start + span;
        check!(
            v,
            state.current <= state.end,
            "bump pointer {:#x} ran past the end {:#x}",
            state.current,
            state.end
        );
        start as *mut u8
    }

    /// Destroy hook: retire an extent for good.
    ///
    /// The range goes back to an inaccessible guard mapping. `current` is not
    /// lowered, so the addresses are never handed out again.
    pub fn destroy(&self, addr: *mut u8, size: usize, _committed: bool) {
        let state = self.state.lock();
        arena_log!("destroy({:p}, {}, {})", addr, size, _committed);

        let v = self.validation;
        let addr = addr as usize;
        check!(
            v,
            addr % PAGE_SIZE == 0,
            "destroy of unaligned extent {addr:#x}"
        );

        let Some(span) = self.extent_span(size) else {
            return;
        };
        check!(
            v,
            state.is_allocated_range(addr, span),
            "destroy of {addr:#x}+{span:#x} outside the grown part of the arena"
        );
        if span == 0 {
            return;
        }
        let retired = unsafe { platform::guard(addr as *mut u8, span) };
        check!(v, retired, "failed to guard {addr:#x}+{span:#x}");

        stat_inc!(destroy_count);
        stat_add!(destroy_bytes, span);
    }

    /// Bytes of address space behind an extent the host knows as `size`
    /// bytes: the representable length in pure-capability mode, rounded up
    /// to whole pages.
    pub fn extent_span(&self, size: usize) -> Option<usize> {
        let len = if self.capability.mode().is_pure() {
            self.capability.representable_length(size)?
        } else {
            size
        };
        align_up(len, PAGE_SIZE)
    }

    /// Purge hooks: discard the physical pages behind
    /// `[addr + offset, addr + offset + length)` of the extent `[addr, addr + size)`.
    ///
    /// Lazy and forced purges are handled alike: both remap the window with
    /// fresh zero pages right away. The window must start and end on page
    /// boundaries. Returns `false`, which in the host's convention means the
    /// purge happened, and `true` when nothing was purged.
    pub fn purge(
        &self,
        kind: PurgeKind,
        addr: *mut u8,
        size: usize,
        offset: usize,
        length: usize,
    ) -> bool {
        let state = self.state.lock();
        match kind {
            PurgeKind::Lazy => {
                stat_inc!(purge_lazy_count);
                arena_log!("purge_lazy({:p}, {}, {}, {})", addr, size, offset, length);
            }
            PurgeKind::Forced => {
                stat_inc!(purge_forced_count);
                arena_log!("purge_forced({:p}, {}, {}, {})", addr, size, offset, length);
            }
        }
        self.purge_locked(&state, addr as usize, size, offset, length)
    }

    fn purge_locked(
        &self,
        state: &ArenaState,
        addr: usize,
        size: usize,
        offset: usize,
        length: usize,
    ) -> bool {
        let v = self.validation;
        check!(v, offset <= size, "purge offset {offset:#x} past extent size {size:#x}");
        check!(
            v,
            offset.checked_add(length).is_some_and(|e| e <= size),
            "purge window {offset:#x}+{length:#x} past extent size {size:#x}"
        );
        check!(
            v,
            state.is_allocated_range(addr, size),
            "purge of {addr:#x}+{size:#x} outside the grown part of the arena"
        );
        let start = addr.wrapping_add(offset);
        check!(
            v,
            state.is_allocated_range(start, length),
            "purge window {start:#x}+{length:#x} outside the grown part of the arena"
        );

        // Only whole pages can be remapped. A window that splits a page
        // cannot be zero-filled, so it is never reported as purged.
        let whole_pages = start % PAGE_SIZE == 0 && length % PAGE_SIZE == 0;
        check!(
            v,
            whole_pages,
            "purge window {start:#x}+{length:#x} is not page aligned"
        );
        if !whole_pages {
            return true;
        }

        if length > 0 {
            let purged = unsafe { platform::purge(start as *mut u8, length) };
            check!(v, purged, "failed to remap {start:#x}+{length:#x}");
            if !purged {
                return true;
            }
            stat_add!(purge_bytes, length);
        }
        false
    }
}

impl<C: Capability> Drop for Arena<C> {
    fn drop(&mut self) {
        unsafe { platform::release(self.region.as_ptr(), self.region.len()) };
    }
}
