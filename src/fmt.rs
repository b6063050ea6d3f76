//! Logging shims
//!
//! Hosts (`std`) log through `tracing`, firmware builds with `defmt-impl` log through `defmt`.
//! Only `{}` and `{:?}` placeholders are portable between the two. Without either backend the
//! arguments are still evaluated, so nothing they mention goes unused.
#![allow(unused_macros)]

macro_rules! trace {
    ($($arg:tt)+) => {{
        #[cfg(feature = "std")]
        ::tracing::trace!($($arg)+);
        #[cfg(all(feature = "defmt-impl", not(feature = "std")))]
        ::defmt::trace!($($arg)+);
        #[cfg(not(any(feature = "std", feature = "defmt-impl")))]
        let _ = ($($arg)+);
    }};
}

macro_rules! debug {
    ($($arg:tt)+) => {{
        #[cfg(feature = "std")]
        ::tracing::debug!($($arg)+);
        #[cfg(all(feature = "defmt-impl", not(feature = "std")))]
        ::defmt::debug!($($arg)+);
        #[cfg(not(any(feature = "std", feature = "defmt-impl")))]
        let _ = ($($arg)+);
    }};
}

macro_rules! info {
    ($($arg:tt)+) => {{
        #[cfg(feature = "std")]
        ::tracing::info!($($arg)+);
        #[cfg(all(feature = "defmt-impl", not(feature = "std")))]
        ::defmt::info!($($arg)+);
        #[cfg(not(any(feature = "std", feature = "defmt-impl")))]
        let _ = ($($arg)+);
    }};
}

macro_rules! warn {
    ($($arg:tt)+) => {{
        #[cfg(feature = "std")]
        ::tracing::warn!($($arg)+);
        #[cfg(all(feature = "defmt-impl", not(feature = "std")))]
        ::defmt::warn!($($arg)+);
        #[cfg(not(any(feature = "std", feature = "defmt-impl")))]
        let _ = ($($arg)+);
    }};
}

macro_rules! error {
    ($($arg:tt)+) => {{
        #[cfg(feature = "std")]
        ::tracing::error!($($arg)+);
        #[cfg(all(feature = "defmt-impl", not(feature = "std")))]
        ::defmt::error!($($arg)+);
        #[cfg(not(any(feature = "std", feature = "defmt-impl")))]
        let _ = ($($arg)+);
    }};
}

/// Lowercase hex rendering of raw line traffic
#[allow(dead_code)]
pub(crate) struct Hex<'a>(pub &'a [u8]);

#[cfg(feature = "std")]
impl core::fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt-impl")]
impl ::defmt::Format for Hex<'_> {
    fn format(&self, fmt: ::defmt::Formatter<'_>) {
        ::defmt::write!(fmt, "{=[u8]:x}", self.0)
    }
}
