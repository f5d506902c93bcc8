//! The keyed hasher: sizing, masking, engine binding and the reset protocol.
//!
//! A [`KeyedHasher`] is a small `Copy` handle. It holds no key bytes; every
//! operation takes the worker's [`KeyCache`] and resolves the buffer there.
//!
//! ```text
//! KeyedHasher::with_key_size(&mut cache, 8832)
//!   key_size = 8832 (rounded down to 16)
//!   key_mask = 8191
//!   engine   = Vectorized | Portable
//!
//! hash_fresh(&mut cache, block)
//!   active[0..=8191] <- refresh[0..=8191]
//!   engine(active[0..=8191], block) -> u64
//! ```
//!
//! Allocation failure never surfaces from here. A hasher that cannot get its
//! buffer hashes through a one-byte zero window instead.

use crate::{
  cache::KeyCache,
  engine::{BLOCK_LEN, Engine},
  key::{KeyBuffer, Seed, expand_seed},
  mask::{DEFAULT_KEY_SIZE, keymask, round_key_size},
};

/// How a hash call treats mutation left in the active window by earlier calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Sequencing {
  /// Restore the active window from the refresh region first. The digest
  /// depends only on the key and the block.
  #[default]
  Fresh,
  /// Hash over whatever the previous call left behind.
  Chained,
}

/// Per-use-site hashing configuration bound to a worker's [`KeyCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyedHasher {
  key_size: usize,
  key_mask: usize,
  engine: Engine,
}

impl KeyedHasher {
  /// A hasher with [`DEFAULT_KEY_SIZE`] and the detected engine.
  #[must_use]
  pub fn new(cache: &mut KeyCache) -> Self {
    Self::with_key_size(cache, DEFAULT_KEY_SIZE)
  }

  /// A hasher with `requested` bytes of key (rounded down to 16) and the
  /// detected engine.
  #[must_use]
  pub fn with_key_size(cache: &mut KeyCache, requested: usize) -> Self {
    Self::with_engine(cache, requested, Engine::detect())
  }

  /// A hasher bound to `engine`, clamped to what this host supports.
  ///
  /// Acquires the worker's buffer for the rounded size. If that fails, or the
  /// size rounds to zero, the hasher is degenerate: `key_size == 0` and
  /// `key_mask == 0`. A zero-size request still releases a buffer of another
  /// size held by the worker.
  #[must_use]
  pub fn with_engine(cache: &mut KeyCache, requested: usize, engine: Engine) -> Self {
    let engine = Engine::resolve(engine);
    let rounded = round_key_size(requested);

    let key_size = if rounded == 0 {
      cache.release();
      0
    } else {
      match cache.acquire(rounded) {
        Ok(_) => rounded,
        Err(_) => 0,
      }
    };

    let hasher = Self {
      key_size,
      key_mask: keymask(key_size),
      engine,
    };
    log::debug!(
      "keyed hasher: requested={requested} key_size={} key_mask={} engine={}",
      hasher.key_size,
      hasher.key_mask,
      hasher.engine
    );
    hasher
  }

  /// Key size in bytes, a multiple of 16. Zero when degenerate.
  #[inline]
  #[must_use]
  pub const fn key_size(&self) -> usize {
    self.key_size
  }

  #[inline]
  #[must_use]
  pub const fn key_mask(&self) -> usize {
    self.key_mask
  }

  #[inline]
  #[must_use]
  pub const fn engine(&self) -> Engine {
    self.engine
  }

  #[inline]
  #[must_use]
  pub const fn is_degenerate(&self) -> bool {
    self.key_size == 0
  }

  /// Bytes restored by [`reset_active_window`](Self::reset_active_window).
  #[inline]
  #[must_use]
  pub const fn refresh_size(&self) -> usize {
    self.key_mask + 1
  }

  /// The worker's buffer for this hasher's size, re-acquired if a hasher of
  /// another size replaced it.
  ///
  /// Failures are logged by the cache, once per failing size.
  fn buffer<'c>(&self, cache: &'c mut KeyCache) -> Option<&'c mut KeyBuffer> {
    if self.is_degenerate() {
      return None;
    }
    cache.acquire(self.key_size).ok()
  }

  /// Expand `seed` into the refresh region and mirror it into the active one.
  ///
  /// Returns `false` without touching the buffer when it already holds `seed`,
  /// or when the hasher has no buffer.
  pub fn load_key(&self, cache: &mut KeyCache, seed: &Seed) -> bool {
    self.load_key_with(cache, seed, |refresh| expand_seed(seed, refresh))
  }

  /// Like [`load_key`](Self::load_key), with a caller-supplied expansion.
  ///
  /// `fill` receives the whole refresh region.
  pub fn load_key_with(&self, cache: &mut KeyCache, seed: &Seed, fill: impl FnOnce(&mut [u8])) -> bool {
    let Some(buffer) = self.buffer(cache) else {
      return false;
    };
    if buffer.descriptor().seed.as_ref() == Some(seed) {
      return false;
    }
    buffer.install(*seed, fill);
    true
  }

  /// Copy refresh bytes `[0, key_mask]` over the active window.
  ///
  /// # Panics
  ///
  /// With `debug_assertions` or the `consistency-checks` feature, panics if
  /// the active region beyond the window no longer matches the refresh
  /// region.
  pub fn reset_active_window(&self, cache: &mut KeyCache) {
    let Some(buffer) = self.buffer(cache) else {
      return;
    };
    buffer.reset_window(self.key_mask);

    #[cfg(any(debug_assertions, feature = "consistency-checks"))]
    assert!(
      buffer.tail_is_consistent(self.key_mask),
      "active key region diverged from refresh region beyond byte {}",
      self.key_mask
    );
  }

  /// Hash `block` over the active window as the previous call left it.
  pub fn hash(&self, cache: &mut KeyCache, block: &[u8; BLOCK_LEN]) -> u64 {
    match self.buffer(cache) {
      Some(buffer) => self.engine.hash(buffer.active_window(self.key_mask), block),
      None => self.engine.hash(&mut [0u8; 1], block),
    }
  }

  /// Hash `block` over a caller-owned key instead of the worker's buffer.
  ///
  /// The engine reads and may rewrite `key[..=key_mask]`; the rest of `key`
  /// is left untouched. No reset is performed.
  ///
  /// # Panics
  ///
  /// Panics if `key` is not longer than [`key_mask`](Self::key_mask).
  pub fn hash_with_key(&self, key: &mut [u8], block: &[u8; BLOCK_LEN]) -> u64 {
    assert!(
      key.len() > self.key_mask,
      "key of {} bytes is shorter than the {}-byte window",
      key.len(),
      self.key_mask + 1
    );
    self.engine.hash(&mut key[..=self.key_mask], block)
  }

  /// Reset the active window, then hash `block`.
  pub fn hash_fresh(&self, cache: &mut KeyCache, block: &[u8; BLOCK_LEN]) -> u64 {
    self.reset_active_window(cache);
    self.hash(cache, block)
  }

  /// Hash `block` with caller-selected sequencing.
  pub fn hash_with(&self, cache: &mut KeyCache, block: &[u8; BLOCK_LEN], sequencing: Sequencing) -> u64 {
    match sequencing {
      Sequencing::Fresh => self.hash_fresh(cache, block),
      Sequencing::Chained => self.hash(cache, block),
    }
  }
}
