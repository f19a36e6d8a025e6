//! Portable scalar kernel.
//!
//! Everything here is pure and allocation-free; it is both the fallback for
//! CPUs without SIMD and the reference the SIMD kernels are tested against.

use crate::{BLOCK_LEN, CHUNK_END, CHUNK_LEN, CHUNK_START, IV, MSG_SCHEDULE, OUT_LEN, PARENT, first_8, words16_from_le, words8_to_le};

/// The BLAKE3 compression function.
///
/// Maps (chaining value, 16 message words, counter, block length, flags) to
/// the full 16-word output state. The first 8 output words are the chaining
/// value; all 16 feed root/extendable output.
pub(crate) fn compress(cv: &[u32; 8], block: &[u32; 16], counter: u64, block_len: u32, flags: u32) -> [u32; 16] {
  let mut v = [
    cv[0],
    cv[1],
    cv[2],
    cv[3],
    cv[4],
    cv[5],
    cv[6],
    cv[7],
    IV[0],
    IV[1],
    IV[2],
    IV[3],
    counter as u32,
    (counter >> 32) as u32,
    block_len,
    flags,
  ];

  macro_rules! g {
    ($a:expr, $b:expr, $c:expr, $d:expr, $mx:expr, $my:expr) => {{
      v[$a] = v[$a].wrapping_add(v[$b]).wrapping_add($mx);
      v[$d] = (v[$d] ^ v[$a]).rotate_right(16);
      v[$c] = v[$c].wrapping_add(v[$d]);
      v[$b] = (v[$b] ^ v[$c]).rotate_right(12);
      v[$a] = v[$a].wrapping_add(v[$b]).wrapping_add($my);
      v[$d] = (v[$d] ^ v[$a]).rotate_right(8);
      v[$c] = v[$c].wrapping_add(v[$d]);
      v[$b] = (v[$b] ^ v[$c]).rotate_right(7);
    }};
  }

  for s in &MSG_SCHEDULE {
    // Columns.
    g!(0, 4, 8, 12, block[s[0]], block[s[1]]);
    g!(1, 5, 9, 13, block[s[2]], block[s[3]]);
    g!(2, 6, 10, 14, block[s[4]], block[s[5]]);
    g!(3, 7, 11, 15, block[s[6]], block[s[7]]);
    // Diagonals.
    g!(0, 5, 10, 15, block[s[8]], block[s[9]]);
    g!(1, 6, 11, 12, block[s[10]], block[s[11]]);
    g!(2, 7, 8, 13, block[s[12]], block[s[13]]);
    g!(3, 4, 9, 14, block[s[14]], block[s[15]]);
  }

  for i in 0..8 {
    v[i] ^= v[i + 8];
    v[i + 8] ^= cv[i];
  }

  v
}

/// Compress whole 64-byte blocks into `cv`, advancing `blocks_compressed`.
///
/// Applies CHUNK_START to the first block of the chunk and nothing else; the
/// caller keeps the chunk's final block out of `blocks` so CHUNK_END (and
/// ROOT, where applicable) can be applied at finalization.
pub(crate) fn compress_chunk_blocks(
  cv: &mut [u32; 8],
  chunk_counter: u64,
  flags: u32,
  blocks_compressed: &mut u8,
  blocks: &[u8],
) {
  debug_assert_eq!(blocks.len() % BLOCK_LEN, 0);

  for block_bytes in blocks.chunks_exact(BLOCK_LEN) {
    let mut block = [0u8; BLOCK_LEN];
    block.copy_from_slice(block_bytes);
    let start = if *blocks_compressed == 0 { CHUNK_START } else { 0 };
    *cv = first_8(compress(
      cv,
      &words16_from_le(&block),
      chunk_counter,
      BLOCK_LEN as u32,
      flags | start,
    ));
    *blocks_compressed = blocks_compressed.wrapping_add(1);
  }
}

/// Merge two child chaining values into their parent's chaining value.
pub(crate) fn parent_cv(left: &[u32; 8], right: &[u32; 8], key_words: &[u32; 8], flags: u32) -> [u32; 8] {
  let mut block = [0u32; 16];
  block[..8].copy_from_slice(left);
  block[8..].copy_from_slice(right);
  first_8(compress(key_words, &block, 0, BLOCK_LEN as u32, PARENT | flags))
}

/// Hash whole contiguous chunks, one chaining value per chunk.
///
/// `input` must hold `input.len() / CHUNK_LEN` complete chunks and `out` must
/// hold `OUT_LEN` bytes per chunk. The chunk counter starts at `counter` and
/// increments per chunk.
pub(crate) fn hash_chunks(input: &[u8], key_words: &[u32; 8], counter: u64, flags: u32, out: &mut [u8]) {
  debug_assert_eq!(input.len() % CHUNK_LEN, 0);
  debug_assert_eq!(out.len(), input.len() / CHUNK_LEN * OUT_LEN);

  for (chunk_index, (chunk, out_cv)) in input
    .chunks_exact(CHUNK_LEN)
    .zip(out.chunks_exact_mut(OUT_LEN))
    .enumerate()
  {
    let chunk_counter = counter.wrapping_add(chunk_index as u64);
    let mut cv = *key_words;

    for (block_index, block_bytes) in chunk.chunks_exact(BLOCK_LEN).enumerate() {
      let mut block = [0u8; BLOCK_LEN];
      block.copy_from_slice(block_bytes);
      let mut block_flags = flags;
      if block_index == 0 {
        block_flags |= CHUNK_START;
      }
      if block_index == CHUNK_LEN / BLOCK_LEN - 1 {
        block_flags |= CHUNK_END;
      }
      cv = first_8(compress(
        &cv,
        &words16_from_le(&block),
        chunk_counter,
        BLOCK_LEN as u32,
        block_flags,
      ));
    }

    out_cv.copy_from_slice(&words8_to_le(&cv));
  }
}
