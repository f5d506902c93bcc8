//! Aligned, zero-initialized byte buffers.
//!
//! Key buffers are read and written with 128-bit vector loads and stores, so
//! their start address must satisfy [`KEY_ALIGN`]. `Vec<u8>` only guarantees
//! byte alignment, hence the dedicated owner type.

use alloc::alloc::{Layout, alloc_zeroed, dealloc};
use core::{ops, ptr::NonNull, slice};

use crate::error::AllocError;

/// Alignment of key buffers: one 128-bit lane.
pub const KEY_ALIGN: usize = 16;

/// An owned, aligned, zero-initialized byte region.
///
/// Released exactly once, on drop.
pub struct AlignedBuf {
  ptr: NonNull<u8>,
  layout: Layout,
}

// SAFETY: AlignedBuf uniquely owns its allocation; there is no shared interior state.
#[allow(unsafe_code)]
unsafe impl Send for AlignedBuf {}
// SAFETY: `&AlignedBuf` only hands out `&[u8]`.
#[allow(unsafe_code)]
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
  /// Allocate `size` zeroed bytes aligned to `align`.
  ///
  /// # Errors
  ///
  /// - [`AllocError::InvalidLayout`] if `size == 0`, `align` is not a power of
  ///   two, or the rounded size overflows `isize`.
  /// - [`AllocError::OutOfMemory`] if the global allocator fails.
  pub fn zeroed(size: usize, align: usize) -> Result<Self, AllocError> {
    if size == 0 {
      return Err(AllocError::InvalidLayout { size, align });
    }
    let layout = Layout::from_size_align(size, align).map_err(|_| AllocError::InvalidLayout { size, align })?;

    // SAFETY: layout has a non-zero size (checked above).
    #[allow(unsafe_code)]
    let raw = unsafe { alloc_zeroed(layout) };

    let ptr = NonNull::new(raw).ok_or(AllocError::OutOfMemory { size, align })?;
    Ok(Self { ptr, layout })
  }

  /// Length in bytes.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.layout.size()
  }

  /// Always `false`: zero-length buffers are rejected at construction.
  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.layout.size() == 0
  }

  /// Alignment the buffer was allocated with.
  #[inline]
  #[must_use]
  pub fn align(&self) -> usize {
    self.layout.align()
  }
}

impl ops::Deref for AlignedBuf {
  type Target = [u8];

  #[inline]
  fn deref(&self) -> &[u8] {
    // SAFETY: ptr is valid for layout.size() initialized (zeroed) bytes for our lifetime.
    #[allow(unsafe_code)]
    unsafe {
      slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size())
    }
  }
}

impl ops::DerefMut for AlignedBuf {
  #[inline]
  fn deref_mut(&mut self) -> &mut [u8] {
    // SAFETY: as in `deref`; `&mut self` guarantees exclusivity.
    #[allow(unsafe_code)]
    unsafe {
      slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size())
    }
  }
}

impl Drop for AlignedBuf {
  fn drop(&mut self) {
    // SAFETY: ptr was returned by `alloc_zeroed(self.layout)` and is freed only here.
    #[allow(unsafe_code)]
    unsafe {
      dealloc(self.ptr.as_ptr(), self.layout);
    }
  }
}

impl core::fmt::Debug for AlignedBuf {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("AlignedBuf")
      .field("len", &self.len())
      .field("align", &self.align())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocation_is_aligned_and_zeroed() {
    for &size in &[16usize, 17, 1024, 17664] {
      let buf = AlignedBuf::zeroed(size, KEY_ALIGN).unwrap();
      assert_eq!(buf.len(), size);
      assert_eq!(buf.as_ptr() as usize % KEY_ALIGN, 0);
      assert!(buf.iter().all(|&b| b == 0));
    }
  }

  #[test]
  fn larger_alignments_are_honored() {
    let buf = AlignedBuf::zeroed(100, 64).unwrap();
    assert_eq!(buf.as_ptr() as usize % 64, 0);
    assert_eq!(buf.align(), 64);
  }

  #[test]
  fn zero_size_is_rejected() {
    assert_eq!(
      AlignedBuf::zeroed(0, KEY_ALIGN).unwrap_err(),
      AllocError::InvalidLayout { size: 0, align: KEY_ALIGN }
    );
  }

  #[test]
  fn bad_alignment_is_rejected() {
    assert!(matches!(
      AlignedBuf::zeroed(32, 3),
      Err(AllocError::InvalidLayout { size: 32, align: 3 })
    ));
  }

  #[test]
  fn overflowing_size_is_rejected() {
    assert!(matches!(
      AlignedBuf::zeroed(usize::MAX, KEY_ALIGN),
      Err(AllocError::InvalidLayout { .. })
    ));
  }

  #[test]
  fn writes_are_visible() {
    let mut buf = AlignedBuf::zeroed(32, KEY_ALIGN).unwrap();
    buf[31] = 0xAB;
    buf[..4].copy_from_slice(&[1, 2, 3, 4]);
    assert_eq!(&buf[..4], &[1, 2, 3, 4]);
    assert_eq!(buf[31], 0xAB);
    assert!(!buf.is_empty());
  }
}
