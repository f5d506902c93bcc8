//! Key size and key mask arithmetic.

/// Engines consume the key in 128-bit lanes; key sizes are rounded down to this.
pub const LANE_BYTES: usize = 16;

/// Default key size: an 8 KiB power-of-two window plus 40 lanes of tail
/// that are carried in the key but never mutated.
pub const DEFAULT_KEY_SIZE: usize = 1024 * 8 + 40 * LANE_BYTES;

/// Round `requested` down to a whole number of lanes.
#[inline]
#[must_use]
pub const fn round_key_size(requested: usize) -> usize {
  requested & !(LANE_BYTES - 1)
}

/// Largest `2^n - 1` with `2^n <= size`, or 0 when `size <= 1`.
///
/// The engine indexes the active window with `& mask` instead of `% size`.
#[inline]
#[must_use]
pub const fn keymask(size: usize) -> usize {
  if size <= 1 {
    0
  } else {
    let top = usize::BITS - 1 - size.leading_zeros();
    (1usize << top) - 1
  }
}
