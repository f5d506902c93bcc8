//! Differential fuzzing of the detected engine against the portable engine.
//!
//! Both workers load the same seed and run the same sequence of fresh and
//! chained calls. Digests and key buffers must match after every call, and
//! `consistency-checks` asserts the untouched tail on every reset.

#![no_main]

use arbitrary::Arbitrary;
use clhash::{BLOCK_LEN, Engine, KeyCache, KeyedHasher, Sequencing};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
  seed: [u8; 32],
  key_size: u16,
  calls: Vec<Call>,
}

#[derive(Arbitrary, Debug)]
struct Call {
  block: [u8; BLOCK_LEN],
  chained: bool,
}

fuzz_target!(|input: Input| {
  let size = usize::from(input.key_size);

  let mut fast_cache = KeyCache::with_budget(None);
  let mut slow_cache = KeyCache::with_budget(None);
  let fast = KeyedHasher::with_engine(&mut fast_cache, size, Engine::detect());
  let slow = KeyedHasher::with_engine(&mut slow_cache, size, Engine::Portable);
  assert_eq!(fast.key_size(), slow.key_size());
  assert_eq!(fast.key_mask(), slow.key_mask());

  fast.load_key(&mut fast_cache, &input.seed);
  slow.load_key(&mut slow_cache, &input.seed);

  for call in input.calls.iter().take(64) {
    let sequencing = if call.chained { Sequencing::Chained } else { Sequencing::Fresh };
    let a = fast.hash_with(&mut fast_cache, &call.block, sequencing);
    let b = slow.hash_with(&mut slow_cache, &call.block, sequencing);
    assert_eq!(
      a,
      b,
      "digest mismatch: {}={a:#018x} portable={b:#018x} key_size={size}",
      fast.engine()
    );

    if let (Some(x), Some(y)) = (fast_cache.buffer(), slow_cache.buffer()) {
      assert_eq!(x.active(), y.active(), "active key mismatch");
      assert!(x.tail_is_consistent(fast.key_mask()), "engine wrote past the window");
    }
  }
});
