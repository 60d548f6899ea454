//! Pluggable invariant checking.
//!
//! Every arena carries a [`Validation`] mode. When enabled, a violated range,
//! alignment or representability invariant panics; with `panic = "abort"`
//! that ends the process. When disabled the checks are skipped entirely and a
//! violated precondition is undefined behaviour, on the understanding that the
//! capability hardware faults on genuinely unsafe accesses anyway.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Validation {
    Enabled,
    Disabled,
}

impl Validation {
    #[inline]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Validation::Enabled)
    }
}

impl Default for Validation {
    /// Enabled in debug builds and with the `strict` feature.
    fn default() -> Self {
        if cfg!(any(debug_assertions, feature = "strict")) {
            Validation::Enabled
        } else {
            Validation::Disabled
        }
    }
}

/// Assert `$cond` when `$mode` is [`Validation::Enabled`]. The condition is
/// not evaluated otherwise.
#[macro_export]
macro_rules! check {
    ($mode:expr, $cond:expr, $($arg:tt)+) => {
        if $crate::validate::Validation::is_enabled($mode) && !$cond {
            $crate::validate::violated(::core::format_args!($($arg)+));
        }
    };
}

#[cold]
#[inline(never)]
#[track_caller]
pub fn violated(args: core::fmt::Arguments<'_>) -> ! {
    panic!("contarena invariant violated: {}", args)
}
