//! Error types for arena setup and host registration.
//!
//! Only setup can fail recoverably at this level. Extent exhaustion is
//! reported to the host as a null extent, and everything else is a fatal
//! invariant check.

use core::fmt;

/// Errors from reserving or configuring an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The requested layout is unusable.
    InvalidConfig {
        /// What was wrong with it.
        reason: &'static str,
    },
    /// The OS refused the address-space reservation.
    ReserveFailed {
        /// Bytes requested.
        size: usize,
        /// Alignment requested.
        align: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
            Self::ReserveFailed { size, align } => write!(
                f,
                "failed to reserve {size} bytes of address space aligned to {align:#x}"
            ),
        }
    }
}

/// Errors reported by a host allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostError {
    /// Arena creation returned a non-zero status.
    CreateFailed {
        /// The host's status code.
        code: i32,
    },
    /// The host has no room for another arena.
    TooManyArenas,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateFailed { code } => {
                write!(f, "host allocator refused to create an arena (status {code})")
            }
            Self::TooManyArenas => write!(f, "host allocator has no free arena slots"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ArenaError {}

#[cfg(feature = "std")]
impl std::error::Error for HostError {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_display_messages() {
        let e = ArenaError::ReserveFailed {
            size: 4096,
            align: 1 << 30,
        };
        assert_eq!(
            e.to_string(),
            "failed to reserve 4096 bytes of address space aligned to 0x40000000"
        );
        assert_eq!(
            HostError::CreateFailed { code: 12 }.to_string(),
            "host allocator refused to create an arena (status 12)"
        );
    }
}
