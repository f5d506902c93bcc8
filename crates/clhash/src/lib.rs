//! Keyed hashing under a large, mutable key for proof-of-work mining.
//!
//! A 64-byte block is hashed to a `u64` under a multi-kilobyte key. Each call
//! may rewrite a power-of-two window of that key, which keeps the hot path
//! bound to cache and memory rather than pure arithmetic.
//!
//! # Usage
//!
//! ```
//! use clhash::{KeyCache, KeyedHasher, Sequencing};
//!
//! // One cache per worker, created when the worker starts.
//! let mut cache = KeyCache::new();
//! let hasher = KeyedHasher::new(&mut cache);
//! hasher.load_key(&mut cache, &[7u8; 32]);
//!
//! let block = [0u8; clhash::BLOCK_LEN];
//! let a = hasher.hash_with(&mut cache, &block, Sequencing::Fresh);
//! let b = hasher.hash_fresh(&mut cache, &block);
//! assert_eq!(a, b);
//! ```
//!
//! # Layout
//!
//! | Module     | Role                                                 |
//! |------------|------------------------------------------------------|
//! | [`mask`]   | key size rounding and the power-of-two window mask   |
//! | [`align`]  | 16-byte aligned zeroed allocations                   |
//! | [`key`]    | descriptor, active/refresh regions, seed expansion   |
//! | [`cache`]  | per-worker ownership of one key buffer               |
//! | [`engine`] | vectorized and portable engines, selection           |
//! | [`config`] | environment overrides                                |
//!
//! # Features
//!
//! - `std` (default): runtime CPU detection and environment overrides.
//! - `consistency-checks`: verify the untouched key tail on every reset, even
//!   in release builds.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod align;
pub mod cache;
pub mod config;
pub mod engine;
mod error;
mod hasher;
pub mod key;
pub mod mask;

pub use cache::KeyCache;
pub use engine::{BLOCK_LEN, Engine, is_optimized};
pub use error::AllocError;
pub use hasher::{KeyedHasher, Sequencing};
pub use key::{KeyDescriptor, Seed};
pub use mask::{DEFAULT_KEY_SIZE, keymask, round_key_size};
