//! Property-based tests for key sizing, masking and the reset protocol.

use clhash::{BLOCK_LEN, Engine, KeyCache, KeyedHasher, Sequencing, keymask, round_key_size};
use proptest::prelude::*;

// Test Strategies

fn arb_block() -> impl Strategy<Value = [u8; BLOCK_LEN]> {
  prop::collection::vec(any::<u8>(), BLOCK_LEN).prop_map(|v| {
    let mut block = [0u8; BLOCK_LEN];
    block.copy_from_slice(&v);
    block
  })
}

fn arb_seed() -> impl Strategy<Value = [u8; 32]> {
  any::<[u8; 32]>()
}

/// Key sizes small enough to keep allocation cheap, covering the degenerate range.
fn arb_key_size() -> impl Strategy<Value = usize> {
  prop_oneof![0usize..64, 64usize..4096, Just(8832usize)]
}

// Size and Mask Properties

proptest! {
  #[test]
  fn rounding_is_floor_to_sixteen(size in any::<usize>()) {
    let rounded = round_key_size(size);
    prop_assert_eq!(rounded, (size / 16) * 16);
    prop_assert!(rounded <= size);
  }

  #[test]
  fn mask_window_is_power_of_two_within_size(size in 2usize..usize::MAX / 2) {
    let mask = keymask(size);
    prop_assert!((mask + 1).is_power_of_two());
    prop_assert!(mask < size);
    // Largest such window: doubling it would overflow the size.
    prop_assert!(2 * (mask + 1) > size);
  }

  #[test]
  fn hasher_size_follows_rounding(requested in arb_key_size()) {
    let mut cache = KeyCache::with_budget(None);
    let hasher = KeyedHasher::with_key_size(&mut cache, requested);
    prop_assert_eq!(hasher.key_size(), round_key_size(requested));
    prop_assert_eq!(hasher.key_mask(), keymask(hasher.key_size()));
    if hasher.key_size() == 0 {
      prop_assert!(hasher.is_degenerate());
      prop_assert_eq!(hasher.key_mask(), 0);
    } else {
      prop_assert!(hasher.refresh_size() <= hasher.key_size());
    }
  }
}

// Reset Protocol Properties

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn fresh_hash_is_deterministic(size in arb_key_size(), seed in arb_seed(), block in arb_block()) {
    let mut cache = KeyCache::with_budget(None);
    let hasher = KeyedHasher::with_key_size(&mut cache, size);
    hasher.load_key(&mut cache, &seed);
    let first = hasher.hash_fresh(&mut cache, &block);
    let _ = hasher.hash_with(&mut cache, &block, Sequencing::Chained);
    prop_assert_eq!(hasher.hash_with(&mut cache, &block, Sequencing::Fresh), first);
  }

  #[test]
  fn chained_hashing_preserves_tail(
    size in 64usize..4096,
    seed in arb_seed(),
    blocks in prop::collection::vec(arb_block(), 1..8),
  ) {
    let mut cache = KeyCache::with_budget(None);
    let hasher = KeyedHasher::with_key_size(&mut cache, size);
    hasher.load_key(&mut cache, &seed);
    for block in &blocks {
      let _ = hasher.hash(&mut cache, block);
    }
    let buffer = cache.buffer().unwrap();
    prop_assert!(buffer.tail_is_consistent(hasher.key_mask()));
    hasher.reset_active_window(&mut cache);
    let buffer = cache.buffer().unwrap();
    prop_assert_eq!(buffer.active(), buffer.refresh());
  }

  #[test]
  fn engines_agree(size in 16usize..4096, seed in arb_seed(), block in arb_block()) {
    let mut fast = KeyCache::with_budget(None);
    let mut slow = KeyCache::with_budget(None);
    let a = KeyedHasher::with_engine(&mut fast, size, Engine::detect());
    let b = KeyedHasher::with_engine(&mut slow, size, Engine::Portable);
    a.load_key(&mut fast, &seed);
    b.load_key(&mut slow, &seed);
    prop_assert_eq!(a.hash(&mut fast, &block), b.hash(&mut slow, &block));
    prop_assert_eq!(fast.buffer().unwrap().active(), slow.buffer().unwrap().active());
  }
}
