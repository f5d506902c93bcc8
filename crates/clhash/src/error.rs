//! Error types.
//!
//! The hashing path itself never returns an error: allocation failures are
//! absorbed by the keyed hasher, which degrades to a zero-size key. These types
//! surface only from the lower-level allocation and cache APIs.

use core::fmt;

/// Key buffer allocation failed.
///
/// Returned by [`AlignedBuf::zeroed`](crate::align::AlignedBuf::zeroed) and
/// [`KeyCache::acquire`](crate::cache::KeyCache::acquire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AllocError {
  /// `size`/`align` do not form a valid layout (zero size, non power-of-two
  /// alignment, or a size that overflows `isize`).
  InvalidLayout {
    /// Requested size in bytes.
    size: usize,
    /// Requested alignment in bytes.
    align: usize,
  },
  /// The global allocator returned null.
  OutOfMemory {
    /// Requested size in bytes.
    size: usize,
    /// Requested alignment in bytes.
    align: usize,
  },
  /// The request exceeds the worker's configured key budget.
  OverBudget {
    /// Requested size in bytes.
    size: usize,
    /// Budget in bytes.
    budget: usize,
  },
}

impl AllocError {
  /// Requested size in bytes.
  #[inline]
  #[must_use]
  pub const fn size(&self) -> usize {
    match *self {
      Self::InvalidLayout { size, .. } | Self::OutOfMemory { size, .. } | Self::OverBudget { size, .. } => size,
    }
  }
}

impl fmt::Display for AllocError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      Self::InvalidLayout { size, align } => {
        write!(f, "invalid key buffer layout: {size} bytes aligned to {align}")
      }
      Self::OutOfMemory { size, align } => {
        write!(f, "out of memory allocating {size} bytes aligned to {align}")
      }
      Self::OverBudget { size, budget } => {
        write!(f, "key buffer of {size} bytes exceeds budget of {budget} bytes")
      }
    }
  }
}

impl core::error::Error for AllocError {}
