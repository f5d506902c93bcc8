//! Portable engine: software carry-less multiply and AES round.
//!
//! Lanes are `u128` read little-endian, so the low 64 bits of a lane are the
//! same bytes an x86 `movq` would extract.

use super::{BLOCK_LEN, REDUCTION_POLY, ROUNDS};

// ─────────────────────────────────────────────────────────────────────────────
// Primitives
// ─────────────────────────────────────────────────────────────────────────────

#[inline(always)]
const fn lo(x: u128) -> u64 {
  x as u64
}

#[inline(always)]
const fn hi(x: u128) -> u64 {
  (x >> 64) as u64
}

/// 64x64 -> 128 carry-less multiplication.
#[inline]
#[must_use]
pub(crate) const fn clmul(a: u64, b: u64) -> u128 {
  let a = a as u128;
  let mut acc = 0u128;
  let mut i = 0;
  while i < 64 {
    if (b >> i) & 1 != 0 {
      acc ^= a << i;
    }
    i += 1;
  }
  acc
}

#[inline(always)]
const fn gf_mul2(x: u8) -> u8 {
  (x << 1) ^ ((x >> 7) * 0x1b)
}

#[inline(always)]
const fn gf_mul3(x: u8) -> u8 {
  gf_mul2(x) ^ x
}

/// One AES encryption round: ShiftRows, SubBytes, MixColumns, AddRoundKey.
///
/// Bit-identical to `_mm_aesenc_si128` on little-endian lanes.
#[must_use]
pub(crate) fn aesenc(state: u128, round_key: u128) -> u128 {
  let t = state.to_le_bytes();

  // SubBytes + ShiftRows, state viewed as a column-major 4x4 matrix.
  let mut s = [0u8; 16];
  for col in 0..4 {
    for row in 0..4 {
      s[row + 4 * col] = SBOX[t[row + 4 * ((col + row) % 4)] as usize];
    }
  }

  let mut out = [0u8; 16];
  for col in 0..4 {
    let i = col * 4;
    let (a0, a1, a2, a3) = (s[i], s[i + 1], s[i + 2], s[i + 3]);
    out[i] = gf_mul2(a0) ^ gf_mul3(a1) ^ a2 ^ a3;
    out[i + 1] = a0 ^ gf_mul2(a1) ^ gf_mul3(a2) ^ a3;
    out[i + 2] = a0 ^ a1 ^ gf_mul2(a2) ^ gf_mul3(a3);
    out[i + 3] = gf_mul3(a0) ^ a1 ^ a2 ^ gf_mul2(a3);
  }

  u128::from_le_bytes(out) ^ round_key
}

#[inline(always)]
fn load(window: &[u8], lane: usize) -> u128 {
  let mut bytes = [0u8; 16];
  bytes.copy_from_slice(&window[lane * 16..lane * 16 + 16]);
  u128::from_le_bytes(bytes)
}

#[inline(always)]
fn store(window: &mut [u8], lane: usize, value: u128) {
  window[lane * 16..lane * 16 + 16].copy_from_slice(&value.to_le_bytes());
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine
// ─────────────────────────────────────────────────────────────────────────────

/// Hash `block` under the key window, mutating only `window`.
///
/// `window.len()` must be a power of two and at least one lane.
#[must_use]
pub(crate) fn hash(window: &mut [u8], block: &[u8; BLOCK_LEN]) -> u64 {
  debug_assert!(window.len() >= 16 && window.len().is_power_of_two());
  let lane_mask = window.len() / 16 - 1;

  let b = [load(block, 0), load(block, 1), load(block, 2), load(block, 3)];
  let operands = [b[0] ^ b[2], b[1] ^ b[3], b[2], b[3]];

  let mut acc = load(window, lane_mask);

  for _ in 0..ROUNDS {
    let selector = lo(acc);
    let r = (selector >> 5) as usize & lane_mask;
    let rx = (selector >> 32) as usize & lane_mask;
    let p = operands[(selector & 3) as usize];
    let q = operands[((selector & 3) ^ 1) as usize];

    match (selector >> 2) & 3 {
      0 => {
        let t1 = load(window, rx);
        let add1 = t1 ^ q;
        acc ^= clmul(lo(add1), hi(add1));
        let t2 = load(window, r);
        store(window, r, t1 ^ acc);
        let add2 = t2 ^ p;
        acc ^= clmul(lo(add2), hi(add2));
        store(window, rx, t2 ^ acc);
      }
      1 => {
        let t1 = load(window, r);
        acc = aesenc(acc ^ p, t1);
        let t2 = load(window, rx);
        store(window, rx, aesenc(t2, acc));
        store(window, r, t1 ^ t2 ^ q);
      }
      2 => {
        let t1 = load(window, r) ^ p;
        acc ^= clmul(hi(t1), hi(q));
        store(window, r, (t1 ^ acc).rotate_left(64));
      }
      _ => {
        let t1 = load(window, rx);
        acc = aesenc(acc, t1 ^ q);
        acc ^= clmul(lo(acc), lo(p));
        store(window, rx, t1 ^ p ^ acc);
        let t2 = load(window, r);
        store(window, r, t2 ^ acc);
      }
    }
  }

  reduce(acc)
}

/// Fold the 128-bit accumulator to 64 bits modulo `x^64 + x^4 + x^3 + x + 1`.
#[inline]
#[must_use]
pub(crate) const fn reduce(acc: u128) -> u64 {
  let t = clmul(hi(acc), REDUCTION_POLY);
  let u = clmul(hi(t), REDUCTION_POLY);
  lo(acc) ^ lo(t) ^ lo(u)
}

/// AES S-box.
const SBOX: [u8; 256] = [
  0x63, 0x7c, 0x77, 0x7b, 0xf2, 0x6b, 0x6f, 0xc5, 0x30, 0x01, 0x67, 0x2b, 0xfe, 0xd7, 0xab, 0x76, 0xca, 0x82, 0xc9, 0x7d,
  0xfa, 0x59, 0x47, 0xf0, 0xad, 0xd4, 0xa2, 0xaf, 0x9c, 0xa4, 0x72, 0xc0, 0xb7, 0xfd, 0x93, 0x26, 0x36, 0x3f, 0xf7, 0xcc,
  0x34, 0xa5, 0xe5, 0xf1, 0x71, 0xd8, 0x31, 0x15, 0x04, 0xc7, 0x23, 0xc3, 0x18, 0x96, 0x05, 0x9a, 0x07, 0x12, 0x80, 0xe2,
  0xeb, 0x27, 0xb2, 0x75, 0x09, 0x83, 0x2c, 0x1a, 0x1b, 0x6e, 0x5a, 0xa0, 0x52, 0x3b, 0xd6, 0xb3, 0x29, 0xe3, 0x2f, 0x84,
  0x53, 0xd1, 0x00, 0xed, 0x20, 0xfc, 0xb1, 0x5b, 0x6a, 0xcb, 0xbe, 0x39, 0x4a, 0x4c, 0x58, 0xcf, 0xd0, 0xef, 0xaa, 0xfb,
  0x43, 0x4d, 0x33, 0x85, 0x45, 0xf9, 0x02, 0x7f, 0x50, 0x3c, 0x9f, 0xa8, 0x51, 0xa3, 0x40, 0x8f, 0x92, 0x9d, 0x38, 0xf5,
  0xbc, 0xb6, 0xda, 0x21, 0x10, 0xff, 0xf3, 0xd2, 0xcd, 0x0c, 0x13, 0xec, 0x5f, 0x97, 0x44, 0x17, 0xc4, 0xa7, 0x7e, 0x3d,
  0x64, 0x5d, 0x19, 0x73, 0x60, 0x81, 0x4f, 0xdc, 0x22, 0x2a, 0x90, 0x88, 0x46, 0xee, 0xb8, 0x14, 0xde, 0x5e, 0x0b, 0xdb,
  0xe0, 0x32, 0x3a, 0x0a, 0x49, 0x06, 0x24, 0x5c, 0xc2, 0xd3, 0xac, 0x62, 0x91, 0x95, 0xe4, 0x79, 0xe7, 0xc8, 0x37, 0x6d,
  0x8d, 0xd5, 0x4e, 0xa9, 0x6c, 0x56, 0xf4, 0xea, 0x65, 0x7a, 0xae, 0x08, 0xba, 0x78, 0x25, 0x2e, 0x1c, 0xa6, 0xb4, 0xc6,
  0xe8, 0xdd, 0x74, 0x1f, 0x4b, 0xbd, 0x8b, 0x8a, 0x70, 0x3e, 0xb5, 0x66, 0x48, 0x03, 0xf6, 0x0e, 0x61, 0x35, 0x57, 0xb9,
  0x86, 0xc1, 0x1d, 0x9e, 0xe1, 0xf8, 0x98, 0x11, 0x69, 0xd9, 0x8e, 0x94, 0x9b, 0x1e, 0x87, 0xe9, 0xce, 0x55, 0x28, 0xdf,
  0x8c, 0xa1, 0x89, 0x0d, 0xbf, 0xe6, 0x42, 0x68, 0x41, 0x99, 0x2d, 0x0f, 0xb0, 0x54, 0xbb, 0x16,
];
