//! Half-open address intervals.

/// The address interval `[start, end)`.
///
/// Addresses are plain integers: a `Region` never dereferences anything, it
/// only answers containment questions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// The interval `[addr, addr + len)`, or `None` if it wraps the address space.
    #[inline]
    pub const fn from_len(addr: usize, len: usize) -> Option<Self> {
        match addr.checked_add(len) {
            Some(end) => Some(Self { start: addr, end }),
            None => None,
        }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Whether `[addr, addr + len)` lies entirely within this region.
    /// A range that wraps the address space is never contained.
    #[inline]
    pub const fn contains_range(&self, addr: usize, len: usize) -> bool {
        match addr.checked_add(len) {
            Some(end) => addr >= self.start && end <= self.end,
            None => false,
        }
    }

    /// Whether `other` shares at least one byte with this region.
    #[inline]
    pub const fn overlaps(&self, other: &Region) -> bool {
        self.start < other.end && other.start < self.end
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.start as *mut u8
    }
}
