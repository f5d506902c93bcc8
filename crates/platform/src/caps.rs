//! CPU capability representation.
//!
//! This module answers one question: "Which of the instructions the keyed
//! hasher cares about can legally run on this machine?"
//!
//! # Design
//!
//! [`Caps`] is a 64-bit bitset. Each bit corresponds to one ISA extension.
//! Composite `*_READY` constants bundle everything a kernel needs so dispatch
//! is a single [`Caps::has`] check.
//!
//! # Usage
//!
//! ```ignore
//! use platform::caps::x86;
//!
//! if platform::caps().has(x86::CLHASH_READY) {
//!     // AVX + AES-NI + PCLMULQDQ kernel
//! }
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Core Capability Type
// ─────────────────────────────────────────────────────────────────────────────

/// CPU capabilities: a 64-bit feature bitset.
///
/// `Caps` is `Copy`, `Send`, and `Sync`. It can be freely shared across threads.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Caps(pub(crate) u64);

impl Caps {
  /// Empty capability set (no features).
  pub const NONE: Self = Self(0);

  /// Create a capability set from a raw word.
  ///
  /// Primarily useful for testing and fuzzing; normal code should combine
  /// the predefined constants.
  #[inline]
  #[must_use]
  pub const fn from_raw(word: u64) -> Self {
    Self(word)
  }

  /// The raw underlying word.
  #[inline]
  #[must_use]
  pub const fn as_raw(self) -> u64 {
    self.0
  }

  /// Check if all features in `required` are present.
  #[inline(always)]
  #[must_use]
  pub const fn has(self, required: Self) -> bool {
    (self.0 & required.0) == required.0
  }

  /// Union of two capability sets.
  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Intersection of two capability sets.
  #[inline]
  #[must_use]
  pub const fn intersection(self, other: Self) -> Self {
    Self(self.0 & other.0)
  }

  /// Remove every feature in `other`.
  #[inline]
  #[must_use]
  pub const fn difference(self, other: Self) -> Self {
    Self(self.0 & !other.0)
  }

  /// `true` when no feature bit is set.
  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  /// Number of feature bits set.
  #[inline]
  #[must_use]
  pub const fn count(self) -> u32 {
    self.0.count_ones()
  }

  /// A capability set with exactly one bit set.
  ///
  /// # Panics
  ///
  /// Panics (at compile time when used in a const) if `bit >= 64`.
  #[inline]
  #[must_use]
  pub const fn bit(bit: u8) -> Self {
    assert!(bit < 64, "capability bit out of range");
    Self(1u64 << bit)
  }
}

impl core::ops::BitOr for Caps {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self {
    self.union(rhs)
  }
}

impl core::ops::BitAnd for Caps {
  type Output = Self;

  #[inline]
  fn bitand(self, rhs: Self) -> Self {
    self.intersection(rhs)
  }
}

impl core::ops::BitOrAssign for Caps {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

impl core::fmt::Debug for Caps {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let mut set = f.debug_set();
    for &(name, cap) in x86::NAMED {
      if self.has(cap) {
        set.entry(&name);
      }
    }
    set.finish()
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// x86 / x86_64 Features
// ─────────────────────────────────────────────────────────────────────────────

/// x86/x86_64 feature bits.
pub mod x86 {
  use super::Caps;

  // AVX (OS register-state gated)
  pub const AVX: Caps = Caps::bit(0);

  // Crypto
  pub const AESNI: Caps = Caps::bit(1);
  pub const PCLMULQDQ: Caps = Caps::bit(2);

  /// Everything the vectorized keyed-hash engine requires:
  /// vector-width arithmetic, hardware AES, carry-less multiplication.
  pub const CLHASH_READY: Caps = Caps(AVX.0 | AESNI.0 | PCLMULQDQ.0);

  /// Feature names in bit order, for diagnostics.
  pub const NAMED: &[(&str, Caps)] = &[
    ("avx", AVX),
    ("aes", AESNI),
    ("pclmulqdq", PCLMULQDQ),
  ];
}
