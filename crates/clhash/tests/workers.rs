//! Scenario tests: worker parallelism, size changes and allocation failure.

use std::thread;

use clhash::{AllocError, BLOCK_LEN, DEFAULT_KEY_SIZE, KeyCache, KeyedHasher, is_optimized};

const SEED: [u8; 32] = [0x5c; 32];

fn block(salt: u8) -> [u8; BLOCK_LEN] {
  core::array::from_fn(|i| (i as u8).wrapping_mul(29).wrapping_add(salt))
}

// ─────────────────────────────────────────────────────────────────────────────
// Parallel Workers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn workers_with_same_seed_agree() {
  const WORKERS: usize = 8;
  let digests: Vec<u64> = thread::scope(|s| {
    let handles: Vec<_> = (0..WORKERS)
      .map(|_| {
        s.spawn(|| {
          let mut cache = KeyCache::with_budget(None);
          let hasher = KeyedHasher::new(&mut cache);
          hasher.load_key(&mut cache, &SEED);
          hasher.reset_active_window(&mut cache);
          hasher.hash(&mut cache, &block(1))
        })
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  assert_eq!(digests.len(), WORKERS);
  assert!(digests.windows(2).all(|w| w[0] == w[1]), "digests diverged: {digests:?}");
}

#[test]
fn workers_chain_independently() {
  // Each worker chains over its own buffer; interleaving must not matter.
  let run = |rounds: u8| {
    let mut cache = KeyCache::with_budget(None);
    let hasher = KeyedHasher::with_key_size(&mut cache, 4096);
    hasher.load_key(&mut cache, &SEED);
    (0..rounds).map(|r| hasher.hash(&mut cache, &block(r))).collect::<Vec<_>>()
  };
  let expected = run(16);
  thread::scope(|s| {
    for _ in 0..4 {
      s.spawn(|| assert_eq!(run(16), expected));
    }
  });
}

#[test]
fn detection_is_stable_across_threads() {
  let here = is_optimized();
  thread::scope(|s| {
    for _ in 0..4 {
      s.spawn(move || assert_eq!(is_optimized(), here));
    }
  });
}

// ─────────────────────────────────────────────────────────────────────────────
// Size Changes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn default_scenario_touches_only_the_window() {
  let mut cache = KeyCache::with_budget(None);
  let hasher = KeyedHasher::with_key_size(&mut cache, 8832);
  assert_eq!(hasher.key_size(), DEFAULT_KEY_SIZE);
  assert_eq!(hasher.key_mask(), 8191);
  hasher.load_key(&mut cache, &SEED);
  let before = cache.buffer().unwrap().active()[8192..].to_vec();
  for salt in 0..32 {
    let _ = hasher.hash(&mut cache, &block(salt));
  }
  assert_eq!(&cache.buffer().unwrap().active()[8192..], &before[..]);
}

#[test]
fn smaller_hasher_never_sees_stale_key() {
  let mut cache = KeyCache::with_budget(None);
  let big = KeyedHasher::with_key_size(&mut cache, 8832);
  big.load_key(&mut cache, &SEED);
  let _ = big.hash(&mut cache, &block(0));

  let small = KeyedHasher::with_key_size(&mut cache, 1024);
  let buffer = cache.buffer().unwrap();
  assert_eq!(buffer.key_size(), 1024);
  assert_eq!(buffer.descriptor().seed, None);
  assert!(buffer.active().iter().chain(buffer.refresh()).all(|&b| b == 0));

  // The small hasher over a zeroed key matches a brand-new worker.
  let mut other = KeyCache::with_budget(None);
  let fresh = KeyedHasher::with_key_size(&mut other, 1024);
  assert_eq!(small.hash_fresh(&mut cache, &block(2)), fresh.hash_fresh(&mut other, &block(2)));
}

#[test]
fn same_size_hashers_share_the_buffer() {
  let mut cache = KeyCache::with_budget(None);
  let a = KeyedHasher::with_key_size(&mut cache, 2048);
  assert!(a.load_key(&mut cache, &SEED));
  let b = KeyedHasher::with_key_size(&mut cache, 2048 + 15);
  assert_eq!(b.key_size(), 2048);
  assert!(!b.load_key(&mut cache, &SEED));
  assert_eq!(a.hash_fresh(&mut cache, &block(4)), b.hash_fresh(&mut cache, &block(4)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Allocation Failure
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn forced_allocation_failure_degrades() {
  let mut cache = KeyCache::with_budget(Some(64));
  assert_eq!(
    cache.acquire(DEFAULT_KEY_SIZE).unwrap_err(),
    AllocError::OverBudget {
      size: 2 * DEFAULT_KEY_SIZE,
      budget: 64
    }
  );

  let hasher = KeyedHasher::new(&mut cache);
  assert!(hasher.is_degenerate());
  assert_eq!(hasher.key_size(), 0);
  assert_eq!(hasher.key_mask(), 0);
  assert!(cache.buffer().is_none());

  hasher.reset_active_window(&mut cache);
  let a = hasher.hash(&mut cache, &block(7));
  let b = hasher.hash_fresh(&mut cache, &block(7));
  assert_eq!(a, b);
}

#[test]
fn degenerate_worker_keeps_hashing_in_parallel() {
  let digests: Vec<u64> = thread::scope(|s| {
    (0..4)
      .map(|_| {
        s.spawn(|| {
          let mut cache = KeyCache::with_budget(Some(0));
          KeyedHasher::new(&mut cache).hash(&mut cache, &block(3))
        })
      })
      .collect::<Vec<_>>()
      .into_iter()
      .map(|h| h.join().unwrap())
      .collect()
  });
  assert!(digests.windows(2).all(|w| w[0] == w[1]));
}
