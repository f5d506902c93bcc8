//! Hash engines and capability-based engine selection.
//!
//! Two engines implement the same mixing function:
//!
//! | Engine       | Requires                        | Arch    |
//! |--------------|---------------------------------|---------|
//! | `Vectorized` | AVX + AES-NI + PCLMULQDQ        | x86_64  |
//! | `Portable`   | nothing                         | any     |
//!
//! Both produce bit-identical digests and bit-identical key mutations. The
//! choice is made once, when a [`KeyedHasher`](crate::KeyedHasher) is built,
//! and dispatch is a single `match` on a two-variant enum.
//!
//! # Engine contract
//!
//! ```text
//! engine(window: &mut [u8; key_mask + 1], block: &[u8; 64]) -> u64
//! ```
//!
//! The engine reads the block and the window and may overwrite any byte of
//! the window. It never sees the rest of the key buffer.

pub(crate) mod portable;
#[cfg(target_arch = "x86_64")]
pub(crate) mod x86_64;


use platform::Caps;

use crate::config::{self, EngineForce};

/// Bytes of input consumed per hash call.
pub const BLOCK_LEN: usize = 64;

/// Mixing rounds per hash call.
pub(crate) const ROUNDS: usize = 32;

/// Low terms of the reduction polynomial `x^64 + x^4 + x^3 + x + 1`.
pub(crate) const REDUCTION_POLY: u64 = 0x1b;

/// Bytes in one engine lane.
const LANE: usize = 16;

/// `true` when the host can run the [`Engine::Vectorized`] engine.
///
/// Backed by the process-wide capability cache, so every call in a process
/// returns the same answer. A host whose features cannot be queried reports
/// `false`.
#[inline]
#[must_use]
pub fn is_optimized() -> bool {
  Engine::Vectorized.is_available_with(platform::caps())
}

/// The two execution engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Engine {
  /// SIMD engine using hardware AES rounds and carry-less multiplication.
  Vectorized,
  /// Pure Rust engine, available everywhere.
  Portable,
}

impl Engine {
  /// All engines, fastest first.
  pub const ALL: &'static [Engine] = &[Engine::Vectorized, Engine::Portable];

  /// Stable name for diagnostics.
  #[inline]
  #[must_use]
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Vectorized => "x86_64/avx-aes-pclmul",
      Self::Portable => "portable",
    }
  }

  /// Capabilities the engine needs at runtime.
  #[inline]
  #[must_use]
  pub const fn required_caps(self) -> Caps {
    match self {
      Self::Vectorized => platform::caps::x86::CLHASH_READY,
      Self::Portable => Caps::NONE,
    }
  }

  /// Whether the engine can run on a CPU with `caps`.
  #[inline]
  #[must_use]
  pub const fn is_available_with(self, caps: Caps) -> bool {
    match self {
      Self::Vectorized => cfg!(target_arch = "x86_64") && caps.has(self.required_caps()),
      Self::Portable => true,
    }
  }

  /// Whether the engine can run on this host.
  #[inline]
  #[must_use]
  pub fn is_available(self) -> bool {
    self.is_available_with(platform::caps())
  }

  /// Clamp a requested engine to what this host supports.
  #[inline]
  #[must_use]
  pub fn resolve(requested: Engine) -> Engine {
    if requested.is_available() {
      requested
    } else {
      Engine::Portable
    }
  }

  /// The engine to use by default: the fastest available one, unless the
  /// configuration forces a choice.
  #[must_use]
  pub fn detect() -> Engine {
    match config::get().effective_force {
      EngineForce::Portable => Engine::Portable,
      EngineForce::Vectorized => Engine::resolve(Engine::Vectorized),
      EngineForce::Auto => {
        if is_optimized() {
          Engine::Vectorized
        } else {
          Engine::Portable
        }
      }
    }
  }

  /// Run the engine over `window`.
  ///
  /// `window.len()` must be a power of two. Windows shorter than one lane
  /// are hashed through a zero-padded scratch lane and only their own bytes
  /// are written back.
  ///
  /// `self` must have come from [`Engine::resolve`] or [`Engine::detect`]
  /// (or be `Portable`), which guarantees the required CPU features.
  #[inline]
  pub(crate) fn hash(self, window: &mut [u8], block: &[u8; BLOCK_LEN]) -> u64 {
    debug_assert!(window.len().is_power_of_two());
    if window.len() < LANE {
      let mut scratch = [0u8; LANE];
      scratch[..window.len()].copy_from_slice(window);
      let digest = self.hash_lanes(&mut scratch, block);
      let len = window.len();
      window.copy_from_slice(&scratch[..len]);
      return digest;
    }
    self.hash_lanes(window, block)
  }

  #[inline(always)]
  fn hash_lanes(self, window: &mut [u8], block: &[u8; BLOCK_LEN]) -> u64 {
    match self {
      #[cfg(target_arch = "x86_64")]
      Self::Vectorized => {
        debug_assert!(self.is_available());
        // SAFETY: Vectorized is only handed out by `resolve`/`detect` after the
        // capability check, and `window` is a power of two of at least one lane.
        #[allow(unsafe_code)]
        unsafe {
          x86_64::hash(window, block)
        }
      }
      #[cfg(not(target_arch = "x86_64"))]
      Self::Vectorized => portable::hash(window, block),
      Self::Portable => portable::hash(window, block),
    }
  }
}

impl core::fmt::Display for Engine {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_str(self.as_str())
  }
}
