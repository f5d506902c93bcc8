//! CPU capability detection for the keyed hasher.
//!
//! This crate is the single source of truth for "can the vectorized engine
//! run here?". Algorithm code asks [`caps()`] instead of doing ad-hoc
//! detection.
//!
//! # Design Philosophy
//!
//! 1. **One API**: callers query `platform::caps()`.
//! 2. **Zero-cost when possible**: compile-time features are detected via `cfg!`.
//! 3. **Cached otherwise**: runtime detection runs once and is cached in a `OnceLock`.
//! 4. **Never fails**: anything that cannot be queried is reported as absent.
//! 5. **Miri-safe**: under Miri, no features are reported.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod caps;
mod detect;

pub use caps::Caps;
pub use detect::{caps_static, detect_uncached};

/// Detected CPU capabilities.
///
/// # Caching
///
/// - With `std`: detected once and cached for the process lifetime.
/// - Without `std`: the compile-time feature set, which is constant.
#[inline]
#[must_use]
pub fn caps() -> Caps {
  detect::caps()
}

/// Install user-supplied capabilities before the first [`caps()`] call.
///
/// Useful for bare-metal deployments where the CPU is known, and for tests
/// that must pin a code path. Returns `Err` with the capabilities already in
/// effect once detection has run; the process-wide value never changes after
/// it has been observed.
///
/// ```ignore
/// // Pin the portable engine for the whole process.
/// let _ = platform::init_with_caps(platform::Caps::NONE);
/// ```
#[inline]
pub fn init_with_caps(caps: Caps) -> Result<(), Caps> {
  detect::init_with_caps(caps)
}
