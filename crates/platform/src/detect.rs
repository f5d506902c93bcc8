//! Runtime CPU detection.
//!
//! - Compile-time detection via `cfg!(target_feature = "...")`
//! - Runtime detection via `is_x86_feature_detected!` (std only)
//! - Caching in a process-wide `OnceLock` (std only)
//! - User-supplied capabilities installed before the first detection
//! - Miri fallback (always reports no features)
//!
//! The cache is populated exactly once, either by detection or by
//! [`init_with_caps`], so every caller in a process observes the same value.

use crate::caps::Caps;

#[cfg(feature = "std")]
static CACHED: std::sync::OnceLock<Caps> = std::sync::OnceLock::new();

// ─────────────────────────────────────────────────────────────────────────────
// Main API
// ─────────────────────────────────────────────────────────────────────────────

/// Detected capabilities, computed once per process.
#[inline]
#[must_use]
pub fn caps() -> Caps {
  #[cfg(miri)]
  {
    Caps::NONE
  }

  #[cfg(all(not(miri), feature = "std"))]
  {
    *CACHED.get_or_init(detect_uncached)
  }

  // Without std the compile-time set is all we can know, and it is constant.
  #[cfg(all(not(miri), not(feature = "std")))]
  {
    caps_static()
  }
}

/// Install capabilities instead of detecting them.
///
/// Must run before the first [`caps()`] call. Returns `Err` with the
/// capabilities already in effect if detection (or an earlier install) won.
///
/// Without `std` there is no cache to install into; the compile-time set is
/// returned as the error.
pub fn init_with_caps(caps: Caps) -> Result<(), Caps> {
  #[cfg(feature = "std")]
  {
    CACHED.set(caps).map_err(|_| self::caps())
  }

  #[cfg(not(feature = "std"))]
  {
    let _ = caps;
    Err(caps_static())
  }
}

/// Detect capabilities without touching the cache.
#[inline]
#[must_use]
pub fn detect_uncached() -> Caps {
  #[cfg(all(target_arch = "x86_64", feature = "std"))]
  {
    caps_static().union(runtime_x86_64())
  }

  #[cfg(not(all(target_arch = "x86_64", feature = "std")))]
  {
    caps_static()
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compile-Time Detection
// ─────────────────────────────────────────────────────────────────────────────

/// Features guaranteed by the compilation target (`-C target-feature=...`).
#[must_use]
pub const fn caps_static() -> Caps {
  #[allow(unused_mut)]
  let mut caps = Caps::NONE;

  #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
  {
    use crate::caps::x86;

    if cfg!(target_feature = "avx") {
      caps = caps.union(x86::AVX);
    }
    if cfg!(target_feature = "aes") {
      caps = caps.union(x86::AESNI);
    }
    if cfg!(target_feature = "pclmulqdq") {
      caps = caps.union(x86::PCLMULQDQ);
    }
  }

  caps
}

// ─────────────────────────────────────────────────────────────────────────────
// x86_64 Runtime Detection
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime feature query.
///
/// `is_x86_feature_detected!("avx")` already checks OSXSAVE and XCR0, so an
/// OS that does not save YMM state reports AVX as absent.
#[cfg(all(target_arch = "x86_64", feature = "std"))]
fn runtime_x86_64() -> Caps {
  use crate::caps::x86;

  let mut caps = Caps::NONE;
  if std::arch::is_x86_feature_detected!("avx") {
    caps |= x86::AVX;
  }
  if std::arch::is_x86_feature_detected!("aes") {
    caps |= x86::AESNI;
  }
  if std::arch::is_x86_feature_detected!("pclmulqdq") {
    caps |= x86::PCLMULQDQ;
  }
  caps
}
