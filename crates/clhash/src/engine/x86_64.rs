//! x86_64 vectorized engine (AVX + AES-NI + PCLMULQDQ).
//!
//! Mirrors `portable::hash` step for step; every load and store happens in
//! the same order so aliasing lanes (`r == rx`) behave identically.

#![allow(unsafe_code)]
#![allow(unsafe_op_in_unsafe_fn)]
#![allow(clippy::inline_always)]

use core::arch::x86_64::*;

use super::{BLOCK_LEN, REDUCTION_POLY, ROUNDS};

#[inline(always)]
unsafe fn loadu(src: *const u8) -> __m128i {
  unsafe { _mm_loadu_si128(src.cast()) }
}

#[inline(always)]
unsafe fn storeu(dest: *mut u8, value: __m128i) {
  unsafe { _mm_storeu_si128(dest.cast(), value) }
}

#[inline(always)]
unsafe fn xor(a: __m128i, b: __m128i) -> __m128i {
  unsafe { _mm_xor_si128(a, b) }
}

// Every caller passes an index already masked with `lane_mask`.
#[inline(always)]
unsafe fn lane(key: *mut u8, i: usize) -> *mut u8 {
  unsafe { key.add(i * 16) }
}

#[inline(always)]
unsafe fn low64(a: __m128i) -> u64 {
  unsafe { _mm_cvtsi128_si64(a) as u64 }
}

/// Hash `block` under the key window, mutating only `window`.
///
/// # Safety
///
/// The caller must ensure the CPU supports AVX, AES-NI and PCLMULQDQ, and that
/// `window.len()` is a power of two of at least 16 bytes.
#[target_feature(enable = "avx,aes,pclmulqdq")]
pub(crate) unsafe fn hash(window: &mut [u8], block: &[u8; BLOCK_LEN]) -> u64 {
  debug_assert!(window.len() >= 16 && window.len().is_power_of_two());
  let lane_mask = window.len() / 16 - 1;
  let key = window.as_mut_ptr();

  let b0 = loadu(block.as_ptr());
  let b1 = loadu(block.as_ptr().add(16));
  let b2 = loadu(block.as_ptr().add(32));
  let b3 = loadu(block.as_ptr().add(48));
  let operands = [xor(b0, b2), xor(b1, b3), b2, b3];

  let mut acc = loadu(lane(key, lane_mask));

  for _ in 0..ROUNDS {
    let selector = low64(acc);
    let r = (selector >> 5) as usize & lane_mask;
    let rx = (selector >> 32) as usize & lane_mask;
    let p = operands[(selector & 3) as usize];
    let q = operands[((selector & 3) ^ 1) as usize];

    match (selector >> 2) & 3 {
      0 => {
        let t1 = loadu(lane(key, rx));
        let add1 = xor(t1, q);
        acc = xor(acc, _mm_clmulepi64_si128(add1, add1, 0x10));
        let t2 = loadu(lane(key, r));
        storeu(lane(key, r), xor(t1, acc));
        let add2 = xor(t2, p);
        acc = xor(acc, _mm_clmulepi64_si128(add2, add2, 0x10));
        storeu(lane(key, rx), xor(t2, acc));
      }
      1 => {
        let t1 = loadu(lane(key, r));
        acc = _mm_aesenc_si128(xor(acc, p), t1);
        let t2 = loadu(lane(key, rx));
        storeu(lane(key, rx), _mm_aesenc_si128(t2, acc));
        storeu(lane(key, r), xor(xor(t1, t2), q));
      }
      2 => {
        let t1 = xor(loadu(lane(key, r)), p);
        acc = xor(acc, _mm_clmulepi64_si128(t1, q, 0x11));
        storeu(lane(key, r), _mm_shuffle_epi32(xor(t1, acc), 0x4e));
      }
      _ => {
        let t1 = loadu(lane(key, rx));
        acc = _mm_aesenc_si128(acc, xor(t1, q));
        acc = xor(acc, _mm_clmulepi64_si128(acc, p, 0x00));
        storeu(lane(key, rx), xor(xor(t1, p), acc));
        let t2 = loadu(lane(key, r));
        storeu(lane(key, r), xor(t2, acc));
      }
    }
  }

  reduce(acc)
}

#[inline(always)]
unsafe fn reduce(acc: __m128i) -> u64 {
  let poly = _mm_set_epi64x(0, REDUCTION_POLY as i64);
  let t = _mm_clmulepi64_si128(acc, poly, 0x01);
  let u = _mm_clmulepi64_si128(t, poly, 0x01);
  low64(xor(xor(acc, t), u))
}
