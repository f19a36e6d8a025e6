//! BLAKE3 x86_64 SSE4.1 kernel (4 chunks per pass).
//!
//! The 16-word compression state lives in 16 vectors, one lane per chunk.
//! Message words are gathered across the four chunks by transposing 4×4 word
//! tiles. The 16- and 8-bit rotations are byte shuffles; 12 and 7 are
//! shift-or pairs.

#![allow(clippy::too_many_arguments)]

use core::arch::x86_64::*;

use crate::{BLOCK_LEN, CHUNK_END, CHUNK_LEN, CHUNK_START, IV, MSG_SCHEDULE, OUT_LEN};

pub(crate) const DEGREE: usize = 4;

#[inline(always)]
fn counter_low(counter: u64) -> u32 {
  counter as u32
}

#[inline(always)]
fn counter_high(counter: u64) -> u32 {
  (counter >> 32) as u32
}

#[inline(always)]
unsafe fn loadu(src: *const u8) -> __m128i {
  unsafe { _mm_loadu_si128(src.cast()) }
}

#[inline(always)]
unsafe fn storeu(v: __m128i, dst: *mut u8) {
  unsafe { _mm_storeu_si128(dst.cast(), v) }
}

#[inline(always)]
unsafe fn add(a: __m128i, b: __m128i) -> __m128i {
  unsafe { _mm_add_epi32(a, b) }
}

#[inline(always)]
unsafe fn xor(a: __m128i, b: __m128i) -> __m128i {
  unsafe { _mm_xor_si128(a, b) }
}

#[inline(always)]
unsafe fn set1(x: u32) -> __m128i {
  unsafe { _mm_set1_epi32(x as i32) }
}

#[inline(always)]
unsafe fn set4(a: u32, b: u32, c: u32, d: u32) -> __m128i {
  unsafe { _mm_setr_epi32(a as i32, b as i32, c as i32, d as i32) }
}

#[inline(always)]
unsafe fn rot16_mask() -> __m128i {
  unsafe { _mm_setr_epi8(2, 3, 0, 1, 6, 7, 4, 5, 10, 11, 8, 9, 14, 15, 12, 13) }
}

#[inline(always)]
unsafe fn rot8_mask() -> __m128i {
  unsafe { _mm_setr_epi8(1, 2, 3, 0, 5, 6, 7, 4, 9, 10, 11, 8, 13, 14, 15, 12) }
}

#[inline(always)]
unsafe fn rot12(a: __m128i) -> __m128i {
  unsafe { _mm_or_si128(_mm_srli_epi32(a, 12), _mm_slli_epi32(a, 20)) }
}

#[inline(always)]
unsafe fn rot7(a: __m128i) -> __m128i {
  unsafe { _mm_or_si128(_mm_srli_epi32(a, 7), _mm_slli_epi32(a, 25)) }
}

/// The quarter-round, lane-parallel: identical to the scalar G with every
/// word widened to four lanes.
#[inline(always)]
unsafe fn g(
  v: &mut [__m128i; 16],
  a: usize,
  b: usize,
  c: usize,
  d: usize,
  mx: __m128i,
  my: __m128i,
  rot16: __m128i,
  rot8: __m128i,
) {
  unsafe {
    v[a] = add(add(v[a], v[b]), mx);
    v[d] = _mm_shuffle_epi8(xor(v[d], v[a]), rot16);
    v[c] = add(v[c], v[d]);
    v[b] = rot12(xor(v[b], v[c]));
    v[a] = add(add(v[a], v[b]), my);
    v[d] = _mm_shuffle_epi8(xor(v[d], v[a]), rot8);
    v[c] = add(v[c], v[d]);
    v[b] = rot7(xor(v[b], v[c]));
  }
}

#[inline(always)]
unsafe fn round(v: &mut [__m128i; 16], m: &[__m128i; 16], r: usize, rot16: __m128i, rot8: __m128i) {
  let s = &MSG_SCHEDULE[r];
  unsafe {
    // Columns.
    g(v, 0, 4, 8, 12, m[s[0]], m[s[1]], rot16, rot8);
    g(v, 1, 5, 9, 13, m[s[2]], m[s[3]], rot16, rot8);
    g(v, 2, 6, 10, 14, m[s[4]], m[s[5]], rot16, rot8);
    g(v, 3, 7, 11, 15, m[s[6]], m[s[7]], rot16, rot8);
    // Diagonals.
    g(v, 0, 5, 10, 15, m[s[8]], m[s[9]], rot16, rot8);
    g(v, 1, 6, 11, 12, m[s[10]], m[s[11]], rot16, rot8);
    g(v, 2, 7, 8, 13, m[s[12]], m[s[13]], rot16, rot8);
    g(v, 3, 4, 9, 14, m[s[14]], m[s[15]], rot16, rot8);
  }
}

/// Transpose a 4×4 tile of u32 words across four vectors.
#[inline(always)]
unsafe fn transpose_vecs(vecs: &mut [__m128i; DEGREE]) {
  unsafe {
    let ab_01 = _mm_unpacklo_epi32(vecs[0], vecs[1]);
    let ab_23 = _mm_unpackhi_epi32(vecs[0], vecs[1]);
    let cd_01 = _mm_unpacklo_epi32(vecs[2], vecs[3]);
    let cd_23 = _mm_unpackhi_epi32(vecs[2], vecs[3]);

    vecs[0] = _mm_unpacklo_epi64(ab_01, cd_01);
    vecs[1] = _mm_unpackhi_epi64(ab_01, cd_01);
    vecs[2] = _mm_unpacklo_epi64(ab_23, cd_23);
    vecs[3] = _mm_unpackhi_epi64(ab_23, cd_23);
  }
}

/// Gather one 64-byte block from each lane into 16 word vectors.
#[inline(always)]
unsafe fn load_block_vecs(inputs: &[*const u8; DEGREE], block_offset: usize) -> [__m128i; 16] {
  unsafe {
    let mut m = [_mm_setzero_si128(); 16];
    for quarter in 0..4 {
      let offset = block_offset + quarter * 16;
      let mut tile = [
        loadu(inputs[0].add(offset)),
        loadu(inputs[1].add(offset)),
        loadu(inputs[2].add(offset)),
        loadu(inputs[3].add(offset)),
      ];
      transpose_vecs(&mut tile);
      m[4 * quarter..4 * quarter + 4].copy_from_slice(&tile);
    }
    m
  }
}

/// Hash four whole chunks in parallel, one lane per chunk.
///
/// Lane `i` uses chunk counter `counter + i`. Writes `DEGREE * OUT_LEN` bytes
/// of chaining values to `out`, one 32-byte CV per lane.
///
/// # Safety
/// SSE4.1 and SSSE3 must be available; each pointer in `inputs` must be valid
/// for `CHUNK_LEN` readable bytes and `out` for `DEGREE * OUT_LEN` writable
/// bytes.
#[target_feature(enable = "sse4.1,ssse3")]
unsafe fn hash4_chunks(inputs: &[*const u8; DEGREE], key_words: &[u32; 8], counter: u64, flags: u32, out: *mut u8) {
  unsafe {
    let rot16 = rot16_mask();
    let rot8 = rot8_mask();

    let mut h_vecs = [
      set1(key_words[0]),
      set1(key_words[1]),
      set1(key_words[2]),
      set1(key_words[3]),
      set1(key_words[4]),
      set1(key_words[5]),
      set1(key_words[6]),
      set1(key_words[7]),
    ];
    let counter_lo = set4(
      counter_low(counter),
      counter_low(counter.wrapping_add(1)),
      counter_low(counter.wrapping_add(2)),
      counter_low(counter.wrapping_add(3)),
    );
    let counter_hi = set4(
      counter_high(counter),
      counter_high(counter.wrapping_add(1)),
      counter_high(counter.wrapping_add(2)),
      counter_high(counter.wrapping_add(3)),
    );
    let block_len_vec = set1(BLOCK_LEN as u32);

    const BLOCKS: usize = CHUNK_LEN / BLOCK_LEN;
    for block in 0..BLOCKS {
      let mut block_flags = flags;
      if block == 0 {
        block_flags |= CHUNK_START;
      }
      if block == BLOCKS - 1 {
        block_flags |= CHUNK_END;
      }

      let m = load_block_vecs(inputs, block * BLOCK_LEN);
      let mut v = [
        h_vecs[0],
        h_vecs[1],
        h_vecs[2],
        h_vecs[3],
        h_vecs[4],
        h_vecs[5],
        h_vecs[6],
        h_vecs[7],
        set1(IV[0]),
        set1(IV[1]),
        set1(IV[2]),
        set1(IV[3]),
        counter_lo,
        counter_hi,
        block_len_vec,
        set1(block_flags),
      ];

      for r in 0..7 {
        round(&mut v, &m, r, rot16, rot8);
      }

      for i in 0..8 {
        h_vecs[i] = xor(v[i], v[i + 8]);
      }
    }

    // Untranspose: each lane's 8-word CV becomes 32 contiguous output bytes.
    let mut lo = [h_vecs[0], h_vecs[1], h_vecs[2], h_vecs[3]];
    let mut hi = [h_vecs[4], h_vecs[5], h_vecs[6], h_vecs[7]];
    transpose_vecs(&mut lo);
    transpose_vecs(&mut hi);
    for lane in 0..DEGREE {
      storeu(lo[lane], out.add(lane * OUT_LEN));
      storeu(hi[lane], out.add(lane * OUT_LEN + 16));
    }
  }
}

/// Hash whole contiguous chunks, four lanes at a time.
///
/// Slice-level twin of [`crate::portable::hash_chunks`]; `input` must hold
/// `input.len() / CHUNK_LEN` complete chunks and `out` one `OUT_LEN`-byte CV
/// per chunk.
///
/// # Safety
/// SSE4.1 and SSSE3 must be available.
#[target_feature(enable = "sse4.1,ssse3")]
pub(crate) unsafe fn hash_chunks(input: &[u8], key_words: &[u32; 8], counter: u64, flags: u32, out: &mut [u8]) {
  debug_assert_eq!(input.len() % CHUNK_LEN, 0);
  let mut num_chunks = input.len() / CHUNK_LEN;
  debug_assert_eq!(out.len(), num_chunks * OUT_LEN);

  let mut inp = input.as_ptr();
  let mut outp = out.as_mut_ptr();
  let mut counter = counter;

  unsafe {
    while num_chunks >= DEGREE {
      let ptrs = [inp, inp.add(CHUNK_LEN), inp.add(2 * CHUNK_LEN), inp.add(3 * CHUNK_LEN)];
      hash4_chunks(&ptrs, key_words, counter, flags, outp);
      inp = inp.add(DEGREE * CHUNK_LEN);
      outp = outp.add(DEGREE * OUT_LEN);
      counter = counter.wrapping_add(DEGREE as u64);
      num_chunks -= DEGREE;
    }

    if num_chunks != 0 {
      // Tail of 1-3 chunks: fill the unused lanes with the final chunk
      // pointer and copy only the needed outputs. Duplicated lanes compute
      // CVs under the wrong counter, which are never read.
      let last = inp.add((num_chunks - 1) * CHUNK_LEN);
      let ptrs = [
        inp,
        if num_chunks > 1 { inp.add(CHUNK_LEN) } else { last },
        if num_chunks > 2 { inp.add(2 * CHUNK_LEN) } else { last },
        last,
      ];

      let mut tmp = [0u8; DEGREE * OUT_LEN];
      hash4_chunks(&ptrs, key_words, counter, flags, tmp.as_mut_ptr());
      core::ptr::copy_nonoverlapping(tmp.as_ptr(), outp, num_chunks * OUT_LEN);
    }
  }
}

/// Generate four consecutive 64-byte root output blocks.
///
/// All lanes share the chaining value, message, block length, and flags; lane
/// `i` uses output block counter `counter + i`.
///
/// # Safety
/// SSE4.1 and SSSE3 must be available and `out` must be valid for `4 * 64`
/// writable bytes.
#[target_feature(enable = "sse4.1,ssse3")]
pub(crate) unsafe fn root_output_blocks4(
  chaining_value: &[u32; 8],
  block_words: &[u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
  out: *mut u8,
) {
  unsafe {
    let rot16 = rot16_mask();
    let rot8 = rot8_mask();

    let mut m = [_mm_setzero_si128(); 16];
    for (vec, &word) in m.iter_mut().zip(block_words) {
      *vec = set1(word);
    }

    let mut v = [
      set1(chaining_value[0]),
      set1(chaining_value[1]),
      set1(chaining_value[2]),
      set1(chaining_value[3]),
      set1(chaining_value[4]),
      set1(chaining_value[5]),
      set1(chaining_value[6]),
      set1(chaining_value[7]),
      set1(IV[0]),
      set1(IV[1]),
      set1(IV[2]),
      set1(IV[3]),
      set4(
        counter_low(counter),
        counter_low(counter.wrapping_add(1)),
        counter_low(counter.wrapping_add(2)),
        counter_low(counter.wrapping_add(3)),
      ),
      set4(
        counter_high(counter),
        counter_high(counter.wrapping_add(1)),
        counter_high(counter.wrapping_add(2)),
        counter_high(counter.wrapping_add(3)),
      ),
      set1(block_len),
      set1(flags),
    ];

    for r in 0..7 {
      round(&mut v, &m, r, rot16, rot8);
    }

    // Root output keeps all 16 words per lane.
    for i in 0..8 {
      v[i] = xor(v[i], v[i + 8]);
      v[i + 8] = xor(v[i + 8], set1(chaining_value[i]));
    }

    for quarter in 0..4 {
      let mut tile = [v[4 * quarter], v[4 * quarter + 1], v[4 * quarter + 2], v[4 * quarter + 3]];
      transpose_vecs(&mut tile);
      for lane in 0..DEGREE {
        storeu(tile[lane], out.add(lane * 2 * OUT_LEN + quarter * 16));
      }
    }
  }
}
