//! Per-worker key cache.
//!
//! A [`KeyCache`] is created once per worker (thread or task) and passed by
//! `&mut` to every hasher operation. It owns at most one [`KeyBuffer`]; a
//! request for a different size releases the old buffer before allocating the
//! new one, so a worker never holds more than one key at a time.
//!
//! The cache is `Send` and reached only through `&mut`, which stands in for
//! thread-local storage. The hashing path takes no locks.

use crate::{
  config,
  error::AllocError,
  key::{KeyBuffer, KeyDescriptor},
};

/// Owner of one worker's key buffer.
#[derive(Debug)]
pub struct KeyCache {
  slot: Option<KeyBuffer>,
  budget: Option<usize>,
  // Size of the last failed allocation, so a persistent failure warns once.
  failed: Option<usize>,
}

impl Default for KeyCache {
  fn default() -> Self {
    Self::new()
  }
}

impl KeyCache {
  /// An empty cache using the configured key budget (`CLHASH_KEY_BUDGET`).
  #[must_use]
  pub fn new() -> Self {
    Self::with_budget(config::get().key_budget)
  }

  /// An empty cache whose buffer may not exceed `budget` bytes.
  ///
  /// The budget covers the whole buffer, i.e. twice the key size.
  #[must_use]
  pub const fn with_budget(budget: Option<usize>) -> Self {
    Self {
      slot: None,
      budget,
      failed: None,
    }
  }

  #[inline]
  #[must_use]
  pub const fn budget(&self) -> Option<usize> {
    self.budget
  }

  /// Return the buffer for `key_size`, allocating on a miss or size mismatch.
  ///
  /// On failure the cache is left empty. The first failure for a given size
  /// is logged; repeated failures for the same size are not.
  ///
  /// # Errors
  ///
  /// [`AllocError::OverBudget`] when `2 * key_size` exceeds the budget, or
  /// whatever [`KeyBuffer::new`] reports.
  pub fn acquire(&mut self, key_size: usize) -> Result<&mut KeyBuffer, AllocError> {
    if self.key_size().is_some_and(|size| size != key_size) {
      self.release();
    }

    let buffer = match self.slot.take() {
      Some(buffer) => buffer,
      None => match self.allocate(key_size) {
        Ok(buffer) => {
          log::trace!("allocated key buffer: key_size={key_size}");
          self.failed = None;
          buffer
        }
        Err(err) => {
          self.record_failure(key_size, &err);
          return Err(err);
        }
      },
    };
    Ok(self.slot.insert(buffer))
  }

  fn allocate(&self, key_size: usize) -> Result<KeyBuffer, AllocError> {
    if let Some(budget) = self.budget {
      let size = key_size.saturating_mul(2);
      if size > budget {
        return Err(AllocError::OverBudget { size, budget });
      }
    }
    KeyBuffer::new(key_size)
  }

  /// Returns `true` when this failure was logged.
  fn record_failure(&mut self, key_size: usize, err: &AllocError) -> bool {
    if self.failed == Some(key_size) {
      return false;
    }
    self.failed = Some(key_size);
    log::warn!("key buffer unavailable ({err}); hashing with a zero-size key");
    true
  }

  /// The cached buffer, if any.
  #[inline]
  #[must_use]
  pub fn buffer(&self) -> Option<&KeyBuffer> {
    self.slot.as_ref()
  }

  #[inline]
  #[must_use]
  pub fn descriptor(&self) -> Option<&KeyDescriptor> {
    self.slot.as_ref().map(KeyBuffer::descriptor)
  }

  /// Size of the cached key, if any.
  #[inline]
  #[must_use]
  pub fn key_size(&self) -> Option<usize> {
    self.slot.as_ref().map(KeyBuffer::key_size)
  }

  /// Drop the cached buffer.
  pub fn release(&mut self) {
    if let Some(buffer) = self.slot.take() {
      log::trace!("released key buffer: key_size={}", buffer.key_size());
    }
  }
}
