//! Key descriptor and the double-length key buffer.
//!
//! A [`KeyBuffer`] is one aligned allocation of `2 * key_size` bytes split into
//! two equal regions:
//!
//! ```text
//! [ active (key_size) | refresh (key_size) ]
//!   ^^^^^^^^^^^^^^^^
//!   mask + 1 bytes are the engine's window; the rest is never mutated
//! ```
//!
//! The refresh region holds the canonical key. The active region is the
//! engine's working copy. Outside of an engine call, bytes of the active
//! region beyond the mask window equal the corresponding refresh bytes.

use crate::{
  align::{AlignedBuf, KEY_ALIGN},
  engine::portable::aesenc,
  error::AllocError,
};

/// A 256-bit key seed.
pub type Seed = [u8; 32];

/// Describes the key material held by a [`KeyBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyDescriptor {
  /// Seed the refresh region was populated from, if any.
  pub seed: Option<Seed>,
  /// Size of each region in bytes.
  pub key_size: usize,
}

/// Aligned storage for the active and refresh key regions.
#[derive(Debug)]
pub struct KeyBuffer {
  descr: KeyDescriptor,
  bytes: AlignedBuf,
}

impl KeyBuffer {
  /// Allocate a zeroed buffer with two regions of `key_size` bytes.
  ///
  /// # Errors
  ///
  /// See [`AlignedBuf::zeroed`]; `key_size == 0` and sizes whose double
  /// overflows are rejected as [`AllocError::InvalidLayout`].
  pub fn new(key_size: usize) -> Result<Self, AllocError> {
    let total = key_size.checked_mul(2).ok_or(AllocError::InvalidLayout {
      size: key_size,
      align: KEY_ALIGN,
    })?;
    let bytes = AlignedBuf::zeroed(total, KEY_ALIGN)?;
    Ok(Self {
      descr: KeyDescriptor { seed: None, key_size },
      bytes,
    })
  }

  #[inline]
  #[must_use]
  pub fn descriptor(&self) -> &KeyDescriptor {
    &self.descr
  }

  #[inline]
  #[must_use]
  pub fn key_size(&self) -> usize {
    self.descr.key_size
  }

  /// The whole active region.
  #[inline]
  #[must_use]
  pub fn active(&self) -> &[u8] {
    &self.bytes[..self.descr.key_size]
  }

  /// The whole refresh region.
  #[inline]
  #[must_use]
  pub fn refresh(&self) -> &[u8] {
    &self.bytes[self.descr.key_size..]
  }

  /// The engine window: the first `key_mask + 1` bytes of the active region.
  ///
  /// # Panics
  ///
  /// Panics if `key_mask` is not below the key size.
  #[inline]
  pub fn active_window(&mut self, key_mask: usize) -> &mut [u8] {
    self.check_mask(key_mask);
    let key_size = self.descr.key_size;
    &mut self.bytes[..key_size][..=key_mask]
  }

  /// Copy refresh bytes `[0, key_mask]` over the active window.
  ///
  /// # Panics
  ///
  /// Panics if `key_mask` is not below the key size.
  pub fn reset_window(&mut self, key_mask: usize) {
    self.check_mask(key_mask);
    let (active, refresh) = self.bytes.split_at_mut(self.descr.key_size);
    active[..=key_mask].copy_from_slice(&refresh[..=key_mask]);
  }

  /// `true` when the active bytes beyond the window match the refresh bytes.
  ///
  /// # Panics
  ///
  /// Panics if `key_mask` is not below the key size.
  #[must_use]
  pub fn tail_is_consistent(&self, key_mask: usize) -> bool {
    self.check_mask(key_mask);
    let start = key_mask + 1;
    self.active()[start..] == self.refresh()[start..]
  }

  #[inline]
  fn check_mask(&self, key_mask: usize) {
    assert!(
      key_mask < self.descr.key_size,
      "key mask {key_mask} outside the {}-byte active region",
      self.descr.key_size
    );
  }

  /// Populate the refresh region with `fill`, then mirror it into the active
  /// region and record `seed`.
  pub fn install(&mut self, seed: Seed, fill: impl FnOnce(&mut [u8])) {
    let (active, refresh) = self.bytes.split_at_mut(self.descr.key_size);
    fill(refresh);
    active.copy_from_slice(refresh);
    self.descr.seed = Some(seed);
    log::trace!("installed key material: {} bytes", self.descr.key_size);
  }
}

/// Expand `seed` into `out` with an AES-round counter construction.
///
/// Deterministic and independent of the engine in use, so every worker
/// expanding the same seed holds the same key.
pub fn expand_seed(seed: &Seed, out: &mut [u8]) {
  let mut lo = [0u8; 16];
  let mut hi = [0u8; 16];
  lo.copy_from_slice(&seed[..16]);
  hi.copy_from_slice(&seed[16..]);
  let mut s0 = u128::from_le_bytes(lo);
  let mut s1 = u128::from_le_bytes(hi);

  for (counter, chunk) in out.chunks_mut(16).enumerate() {
    s0 = aesenc(s0 ^ counter as u128, s1);
    s1 = aesenc(s1, s0);
    let bytes = s0.to_le_bytes();
    chunk.copy_from_slice(&bytes[..chunk.len()]);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_buffer_is_zeroed_and_unseeded() {
    let buf = KeyBuffer::new(64).unwrap();
    assert_eq!(buf.key_size(), 64);
    assert_eq!(buf.active().len(), 64);
    assert_eq!(buf.refresh().len(), 64);
    assert!(buf.active().iter().chain(buf.refresh()).all(|&b| b == 0));
    assert_eq!(buf.descriptor().seed, None);
  }

  #[test]
  fn regions_are_lane_aligned() {
    let buf = KeyBuffer::new(8832).unwrap();
    assert_eq!(buf.active().as_ptr() as usize % KEY_ALIGN, 0);
    assert_eq!(buf.refresh().as_ptr() as usize % KEY_ALIGN, 0);
  }

  #[test]
  fn zero_size_is_rejected() {
    assert!(KeyBuffer::new(0).is_err());
  }

  #[test]
  fn doubled_size_overflow_is_rejected() {
    assert!(matches!(
      KeyBuffer::new(usize::MAX / 2 + 1),
      Err(AllocError::InvalidLayout { .. })
    ));
  }

  #[test]
  fn install_mirrors_refresh_into_active() {
    let mut buf = KeyBuffer::new(48).unwrap();
    buf.install([9; 32], |r| r.iter_mut().enumerate().for_each(|(i, b)| *b = i as u8));
    assert_eq!(buf.active(), buf.refresh());
    assert_eq!(buf.refresh()[47], 47);
    assert_eq!(buf.descriptor().seed, Some([9; 32]));
  }

  #[test]
  fn reset_window_restores_only_the_window() {
    let mut buf = KeyBuffer::new(48).unwrap();
    buf.install([1; 32], |r| r.fill(0xAA));
    buf.active_window(31).fill(0);
    assert!(buf.tail_is_consistent(31));
    buf.reset_window(31);
    assert_eq!(buf.active(), buf.refresh());
  }

  #[test]
  fn tail_inconsistency_is_detected() {
    let mut buf = KeyBuffer::new(48).unwrap();
    buf.install([1; 32], |r| r.fill(0xAA));
    buf.active_window(47)[40] = 0;
    assert!(!buf.tail_is_consistent(31));
    assert!(buf.tail_is_consistent(47));
  }

  #[test]
  fn active_window_stays_in_active_region() {
    let mut buf = KeyBuffer::new(64).unwrap();
    buf.install([2; 32], |r| r.fill(0xAA));
    assert_eq!(buf.active_window(63).len(), 64);
    buf.active_window(63).fill(0);
    assert!(buf.refresh().iter().all(|&b| b == 0xAA));
  }

  #[test]
  #[should_panic(expected = "outside the 64-byte active region")]
  fn active_window_rejects_mask_at_key_size() {
    let mut buf = KeyBuffer::new(64).unwrap();
    let _ = buf.active_window(64);
  }

  #[test]
  #[should_panic(expected = "outside the 64-byte active region")]
  fn active_window_rejects_mask_into_refresh() {
    let mut buf = KeyBuffer::new(64).unwrap();
    buf.install([2; 32], |r| r.fill(0xAA));
    buf.active_window(127)[100] = 0;
  }

  #[test]
  #[should_panic]
  fn reset_window_rejects_mask_at_key_size() {
    let mut buf = KeyBuffer::new(64).unwrap();
    buf.reset_window(64);
  }

  #[test]
  #[should_panic]
  fn tail_check_rejects_mask_at_key_size() {
    let buf = KeyBuffer::new(64).unwrap();
    let _ = buf.tail_is_consistent(64);
  }

  #[test]
  fn expansion_is_deterministic_and_seed_sensitive() {
    let mut a = [0u8; 256];
    let mut b = [0u8; 256];
    let mut c = [0u8; 256];
    expand_seed(&[3; 32], &mut a);
    expand_seed(&[3; 32], &mut b);
    let mut other = [3u8; 32];
    other[31] = 4;
    expand_seed(&other, &mut c);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert!(a.iter().any(|&x| x != 0));
  }

  #[test]
  fn expansion_prefix_is_stable() {
    let mut short = [0u8; 40];
    let mut long = [0u8; 128];
    expand_seed(&[7; 32], &mut short);
    expand_seed(&[7; 32], &mut long);
    assert_eq!(&short[..], &long[..40]);
  }
}
