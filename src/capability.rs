//! Capability encoding and ambient bounds.
//!
//! On capability hardware every pointer carries compressed bounds. A bounds
//! pair can only be encoded exactly when the length and base are suitably
//! rounded, so the grow hook widens each extent to a representable size and
//! alignment before handing it out. Threads running pure-capability code also
//! carry an ambient data capability (DDC) that bounds every access made
//! without an explicit capability; it is bound to the arena once per thread.
//!
//! [`Capability`] is the seam between the arena and the hardware:
//!
//! - [`NoCapability`]: conventional targets. Every length is representable and
//!   binding ambient bounds is a no-op.
//! - [`Concentrate`]: a software model of the CHERI Concentrate compressed
//!   bounds encoding, parameterised on mantissa width. Ambient bounds live in
//!   thread-local storage, so the same checks run on any host.
//!
//! [`DefaultCapability`] picks one at build time (`cheri-model` feature).

use crate::region::Region;

/// How a target uses capabilities.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CapabilityMode {
    /// Plain integer pointers.
    None,
    /// Integer pointers checked against the ambient capability.
    Hybrid,
    /// Every pointer is a capability.
    PureCapability,
}

impl CapabilityMode {
    #[inline]
    pub const fn is_pure(self) -> bool {
        matches!(self, CapabilityMode::PureCapability)
    }
}

/// An extent size and alignment after representability widening.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Widened {
    pub size: usize,
    pub alignment: usize,
}

pub trait Capability: Send + Sync {
    fn mode(&self) -> CapabilityMode;

    /// Mask a base address must satisfy (`base & !mask == 0`) for a capability
    /// of length `len` to be encoded exactly. All bits are set except for zero
    /// or more low-order bits.
    fn representable_alignment_mask(&self, len: usize) -> usize;

    /// Smallest length `>= len` that can be encoded exactly, or `None` if it
    /// would not fit in the address space.
    #[inline]
    fn representable_length(&self, len: usize) -> Option<usize> {
        let mask = self.representable_alignment_mask(len);
        len.checked_add(!mask).map(|v| v & mask)
    }

    /// Bind the calling thread's ambient data capability to `region`.
    fn bind_ambient(&self, region: Region);

    /// The calling thread's ambient bounds, if any are in force.
    fn ambient(&self) -> Option<Region>;

    /// Widen `size` and `alignment` so the extent they describe is exactly
    /// representable. Size only ever grows; the alignment becomes the larger
    /// of the requested one and the encoding's requirement. Identity unless
    /// running pure-capability.
    fn widen(&self, size: usize, alignment: usize) -> Option<Widened> {
        debug_assert!(alignment.is_power_of_two());
        if !self.mode().is_pure() {
            return Some(Widened { size, alignment });
        }
        let align_mask = alignment.wrapping_neg();
        let repr_mask = self.representable_alignment_mask(size);
        let repr_size = self.representable_length(size)?;
        let alignment = (align_mask & repr_mask).wrapping_neg();
        if alignment == 0 {
            // The encoding wants the whole address space as alignment.
            return None;
        }
        Some(Widened {
            size: repr_size,
            alignment,
        })
    }
}

/// Conventional hardware: nothing to widen, nothing to bind.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCapability;

impl Capability for NoCapability {
    #[inline]
    fn mode(&self) -> CapabilityMode {
        CapabilityMode::None
    }

    #[inline]
    fn representable_alignment_mask(&self, _len: usize) -> usize {
        usize::MAX
    }

    #[inline]
    fn bind_ambient(&self, _region: Region) {}

    #[inline]
    fn ambient(&self) -> Option<Region> {
        None
    }
}

/// CHERI Concentrate compressed bounds with a `MW`-bit mantissa.
///
/// Lengths below `2^(MW - 2)` are exact. Above that the exponent is stored in
/// the low three bits of the top and base fields, so base and top must be
/// multiples of `2^(E + 3)`, where `E` is the number of significant bits of
/// `len >> (MW - 1)`. Rounding the length up can carry into a new bit, in
/// which case `E` grows by one.
#[derive(Clone, Copy, Debug)]
pub struct Concentrate<const MW: u32> {
    mode: CapabilityMode,
}

/// 128-bit capabilities with 64-bit addresses (CHERI-RISC-V, mantissa 14).
pub type Cheri128 = Concentrate<14>;

impl<const MW: u32> Concentrate<MW> {
    const MAX_E: u32 = usize::BITS - MW + 2;

    pub const fn pure() -> Self {
        Self {
            mode: CapabilityMode::PureCapability,
        }
    }

    pub const fn hybrid() -> Self {
        Self {
            mode: CapabilityMode::Hybrid,
        }
    }

    #[inline]
    fn exponent(len: usize) -> Option<u32> {
        if len < 1 << (MW - 2) {
            return None;
        }
        let e = usize::BITS - (len >> (MW - 1)).leading_zeros();
        Some(e.min(Self::MAX_E))
    }

    #[inline]
    fn mask_for(e: u32) -> usize {
        usize::MAX.checked_shl(e + 3).unwrap_or(0)
    }
}

impl<const MW: u32> Default for Concentrate<MW> {
    fn default() -> Self {
        Self::pure()
    }
}

impl<const MW: u32> Capability for Concentrate<MW> {
    #[inline]
    fn mode(&self) -> CapabilityMode {
        self.mode
    }

    fn representable_alignment_mask(&self, len: usize) -> usize {
        let Some(e) = Self::exponent(len) else {
            return usize::MAX;
        };
        let mask = Self::mask_for(e);
        match len.checked_add(!mask) {
            Some(v) if Self::exponent(v & mask).is_some_and(|e2| e2 <= e) => mask,
            _ => Self::mask_for((e + 1).min(Self::MAX_E)),
        }
    }

    fn bind_ambient(&self, region: Region) {
        if self.mode.is_pure() {
            ambient::set(region);
        }
    }

    fn ambient(&self) -> Option<Region> {
        match self.mode {
            CapabilityMode::None => None,
            CapabilityMode::PureCapability => ambient::get(),
            // Hybrid code starts out with an ambient capability spanning the
            // whole user address space.
            CapabilityMode::Hybrid => ambient::get().or(Some(Region::new(0, usize::MAX))),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "cheri-model")] {
        pub type DefaultCapability = Cheri128;
    } else {
        pub type DefaultCapability = NoCapability;
    }
}

/// Per-thread ambient bounds slot for the software model.
mod ambient {
    use crate::region::Region;

    cfg_if::cfg_if! {
        if #[cfg(feature = "nightly")] {
            #[thread_local]
            static mut SLOT: Option<Region> = None;

            pub(super) fn set(region: Region) {
                unsafe { SLOT = Some(region) };
            }

            pub(super) fn get() -> Option<Region> {
                unsafe { SLOT }
            }
        } else if #[cfg(any(test, feature = "std"))] {
            use core::cell::Cell;

            std::thread_local! {
                static SLOT: Cell<Option<Region>> = const { Cell::new(None) };
            }

            pub(super) fn set(region: Region) {
                let _ = SLOT.try_with(|slot| slot.set(Some(region)));
            }

            pub(super) fn get() -> Option<Region> {
                SLOT.try_with(Cell::get).ok().flatten()
            }
        } else {
            // No thread-local storage: nothing to bind, nothing to check.
            pub(super) fn set(_region: Region) {}

            pub(super) fn get() -> Option<Region> {
                None
            }
        }
    }
}
