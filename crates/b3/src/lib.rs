//! BLAKE3 (hash + XOF).
//!
//! BLAKE3 compresses 64-byte blocks into 1024-byte chunks, hangs the chunk
//! chaining values off a left-leaning binary Merkle tree, and derives
//! arbitrary-length output from the root compression. This crate implements
//! the full construction: one-shot and streaming hashing, keyed hashing, key
//! derivation, and extendable output, in `no_std` without allocation.
//!
//! Whole-chunk hashing is routed through the best kernel the CPU supports
//! (4-way SSE4.1 on x86_64, portable scalar everywhere else); kernel choice
//! never affects output.
//!
//! # Examples
//!
//! ```
//! use b3::{Digest as _, Xof as _};
//!
//! let digest = b3::hash(b"hello");
//!
//! let mut hasher = b3::Blake3::new();
//! hasher.update(b"hel");
//! hasher.update(b"lo");
//! assert_eq!(hasher.finalize(), digest);
//!
//! let mut out = [0u8; 100];
//! hasher.finalize_xof().squeeze(&mut out);
//! assert_eq!(out[..32], digest);
//! ```
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![allow(clippy::indexing_slicing)] // Fixed-size arrays + internal block parsing
#![no_std]

#[cfg(feature = "std")]
extern crate std;

mod dispatch;
mod hasher;
mod kernels;
mod portable;
#[cfg(target_arch = "x86_64")]
mod x86_64;


pub use hasher::{Blake3, Blake3Xof};
pub use traits::{Digest, InvalidKeyLength, Xof};

/// Digest size in bytes.
pub const OUT_LEN: usize = 32;
/// Key size in bytes for the keyed mode.
pub const KEY_LEN: usize = 32;
/// Compression block size in bytes.
pub const BLOCK_LEN: usize = 64;
/// Chunk size in bytes (16 blocks, one Merkle leaf).
pub const CHUNK_LEN: usize = 1024;

pub(crate) const CHUNK_START: u32 = 1 << 0;
pub(crate) const CHUNK_END: u32 = 1 << 1;
pub(crate) const PARENT: u32 = 1 << 2;
pub(crate) const ROOT: u32 = 1 << 3;
pub(crate) const KEYED_HASH: u32 = 1 << 4;
pub(crate) const DERIVE_KEY_CONTEXT: u32 = 1 << 5;
pub(crate) const DERIVE_KEY_MATERIAL: u32 = 1 << 6;

pub(crate) const IV: [u32; 8] = [
  0x6A09_E667,
  0xBB67_AE85,
  0x3C6E_F372,
  0xA54F_F53A,
  0x510E_527F,
  0x9B05_688C,
  0x1F83_D9AB,
  0x5BE0_CD19,
];

/// Message word permutation schedule.
///
/// Row 0 is the identity; each following row applies the BLAKE3 permutation
/// `[2, 6, 3, 10, 7, 0, 4, 13, 1, 11, 12, 5, 9, 14, 15, 8]` to the row above.
/// `MSG_SCHEDULE[round][i]` gives the index of the message word to use.
pub(crate) const MSG_SCHEDULE: [[usize; 16]; 7] = [
  [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
  [2, 6, 3, 10, 7, 0, 4, 13, 1, 11, 12, 5, 9, 14, 15, 8],
  [3, 4, 10, 12, 13, 2, 7, 14, 6, 5, 9, 0, 11, 15, 8, 1],
  [10, 7, 12, 9, 14, 3, 13, 15, 4, 0, 11, 2, 5, 8, 1, 6],
  [12, 13, 9, 11, 15, 10, 14, 8, 7, 2, 5, 3, 0, 1, 6, 4],
  [9, 14, 11, 5, 8, 12, 15, 1, 13, 3, 0, 10, 2, 6, 4, 7],
  [11, 15, 5, 0, 1, 9, 8, 6, 14, 10, 2, 12, 3, 4, 7, 13],
];

#[inline(always)]
pub(crate) fn words8_from_le(bytes: &[u8; 32]) -> [u32; 8] {
  let mut words = [0u32; 8];
  for (word, src) in words.iter_mut().zip(bytes.chunks_exact(4)) {
    *word = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
  }
  words
}

#[inline(always)]
pub(crate) fn words16_from_le(bytes: &[u8; 64]) -> [u32; 16] {
  let mut words = [0u32; 16];
  for (word, src) in words.iter_mut().zip(bytes.chunks_exact(4)) {
    *word = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
  }
  words
}

#[inline(always)]
pub(crate) fn words8_to_le(words: &[u32; 8]) -> [u8; 32] {
  let mut out = [0u8; 32];
  for (dst, word) in out.chunks_exact_mut(4).zip(words) {
    dst.copy_from_slice(&word.to_le_bytes());
  }
  out
}

/// Serialize 16 state words into 64 little-endian bytes of `out`.
#[inline(always)]
pub(crate) fn store_words16_le(words: &[u32; 16], out: &mut [u8]) {
  debug_assert_eq!(out.len(), BLOCK_LEN);
  for (dst, word) in out.chunks_exact_mut(4).zip(words) {
    dst.copy_from_slice(&word.to_le_bytes());
  }
}

#[inline(always)]
pub(crate) fn first_8(words: [u32; 16]) -> [u32; 8] {
  [
    words[0], words[1], words[2], words[3], words[4], words[5], words[6], words[7],
  ]
}

/// Compute the BLAKE3 hash of `input` in one shot.
#[inline]
#[must_use]
pub fn hash(input: &[u8]) -> [u8; OUT_LEN] {
  hasher::hash_oneshot(input)
}

/// Compute the BLAKE3 XOF of `input` in one shot.
///
/// This avoids constructing a streaming hasher when the caller immediately
/// wants extendable output.
#[inline]
#[must_use]
pub fn xof(input: &[u8]) -> Blake3Xof {
  hasher::xof_oneshot(input)
}

/// Compute the keyed BLAKE3 hash of `input` in one shot.
#[inline]
#[must_use]
pub fn keyed_hash(key: &[u8; KEY_LEN], input: &[u8]) -> [u8; OUT_LEN] {
  hasher::keyed_hash_oneshot(key, input)
}

/// Compute the keyed BLAKE3 XOF of `input` in one shot.
#[inline]
#[must_use]
pub fn keyed_xof(key: &[u8; KEY_LEN], input: &[u8]) -> Blake3Xof {
  hasher::keyed_xof_oneshot(key, input)
}

/// Derive a key for `key_material` in the given `context`, in one shot.
///
/// `context` should be a hardcoded, globally unique application string, e.g.
/// `"example.com 2026-01-01 session tokens v1"`.
#[inline]
#[must_use]
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; OUT_LEN] {
  hasher::derive_key_oneshot(context, key_material)
}
