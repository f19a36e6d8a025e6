//! Chunk state machine, Merkle tree driver, and extendable output.

use traits::{Digest, InvalidKeyLength, Xof};

use crate::{
  BLOCK_LEN, CHUNK_END, CHUNK_LEN, CHUNK_START, DERIVE_KEY_CONTEXT, DERIVE_KEY_MATERIAL, IV, KEY_LEN, KEYED_HASH,
  OUT_LEN, PARENT, ROOT, dispatch, first_8,
  kernels::MAX_SIMD_DEGREE,
  portable, store_words16_le, words8_from_le, words8_to_le, words16_from_le,
};
#[cfg(target_arch = "x86_64")]
use crate::kernels::KernelId;

/// One XOF output block: the 16-word compression state, serialized.
const OUTPUT_BLOCK_LEN: usize = 2 * OUT_LEN;

/// Subtree stack depth. After M chunks the stack holds `popcount(M)` entries,
/// so 54 levels cover every input below 2^54 chunks.
const STACK_DEPTH: usize = 54;

// ─────────────────────────────────────────────────────────────────────────────
// Chunk state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
struct ChunkState {
  chaining_value: [u32; 8],
  chunk_counter: u64,
  block: [u8; BLOCK_LEN],
  block_len: u8,
  blocks_compressed: u8,
  flags: u32,
}

impl ChunkState {
  #[inline]
  fn new(key_words: [u32; 8], chunk_counter: u64, flags: u32) -> Self {
    Self {
      chaining_value: key_words,
      chunk_counter,
      block: [0u8; BLOCK_LEN],
      block_len: 0,
      blocks_compressed: 0,
      flags,
    }
  }

  #[inline]
  fn len(&self) -> usize {
    BLOCK_LEN * self.blocks_compressed as usize + self.block_len as usize
  }

  #[inline]
  fn start_flag(&self) -> u32 {
    if self.blocks_compressed == 0 { CHUNK_START } else { 0 }
  }

  fn update(&mut self, mut input: &[u8]) {
    debug_assert!(self.len() + input.len() <= CHUNK_LEN);

    while !input.is_empty() {
      // A full buffered block with more bytes arriving cannot be the chunk's
      // final block; compress it now. The final block always stays buffered
      // so `output` can apply CHUNK_END (and ROOT, where applicable).
      if self.block_len as usize == BLOCK_LEN {
        let block_words = words16_from_le(&self.block);
        self.chaining_value = first_8(portable::compress(
          &self.chaining_value,
          &block_words,
          self.chunk_counter,
          BLOCK_LEN as u32,
          self.flags | self.start_flag(),
        ));
        self.blocks_compressed = self.blocks_compressed.wrapping_add(1);
        self.block_len = 0;
      }

      let want = BLOCK_LEN - self.block_len as usize;
      let take = want.min(input.len());
      self.block[self.block_len as usize..][..take].copy_from_slice(&input[..take]);
      self.block_len = self.block_len.wrapping_add(take as u8);
      input = &input[take..];
    }
  }

  #[inline]
  fn output(&self) -> OutputState {
    let mut block = self.block;
    block[self.block_len as usize..].fill(0);
    OutputState {
      input_chaining_value: self.chaining_value,
      block_words: words16_from_le(&block),
      counter: self.chunk_counter,
      block_len: self.block_len as u32,
      flags: self.flags | self.start_flag() | CHUNK_END,
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output material
// ─────────────────────────────────────────────────────────────────────────────

/// The inputs of the final compression of a chunk or parent node, retained so
/// output extraction can re-run it with a varying output-block counter.
#[derive(Clone, Copy)]
struct OutputState {
  input_chaining_value: [u32; 8],
  block_words: [u32; 16],
  counter: u64,
  block_len: u32,
  flags: u32,
}

impl OutputState {
  /// Chaining value of this node, for use as a tree child.
  #[inline]
  fn chaining_value(&self) -> [u32; 8] {
    first_8(portable::compress(
      &self.input_chaining_value,
      &self.block_words,
      self.counter,
      self.block_len,
      self.flags,
    ))
  }

  #[inline]
  fn root_hash_words(&self) -> [u32; 8] {
    first_8(portable::compress(
      &self.input_chaining_value,
      &self.block_words,
      0,
      self.block_len,
      self.flags | ROOT,
    ))
  }

  #[inline]
  fn root_hash_bytes(&self) -> [u8; OUT_LEN] {
    words8_to_le(&self.root_hash_words())
  }
}

#[inline]
fn parent_output(left: &[u32; 8], right: &[u32; 8], key_words: &[u32; 8], flags: u32) -> OutputState {
  let mut block_words = [0u32; 16];
  block_words[..8].copy_from_slice(left);
  block_words[8..].copy_from_slice(right);
  OutputState {
    input_chaining_value: *key_words,
    block_words,
    counter: 0,
    block_len: BLOCK_LEN as u32,
    flags: PARENT | flags,
  }
}

/// Fill `out` (a whole number of 64-byte output blocks) with root output,
/// starting at output block `block_counter`.
fn fill_output_blocks(output: &OutputState, mut block_counter: u64, mut out: &mut [u8]) {
  debug_assert_eq!(out.len() % OUTPUT_BLOCK_LEN, 0);
  let flags = output.flags | ROOT;

  #[cfg(target_arch = "x86_64")]
  {
    if dispatch::active_kernel().id == KernelId::X86Sse41 {
      while out.len() >= 4 * OUTPUT_BLOCK_LEN {
        let (head, rest) = out.split_at_mut(4 * OUTPUT_BLOCK_LEN);
        // SAFETY: dispatch only selects this kernel when SSE4.1 and SSSE3 are
        // available, and `head` holds exactly 4 output blocks.
        unsafe {
          crate::x86_64::sse41::root_output_blocks4(
            &output.input_chaining_value,
            &output.block_words,
            block_counter,
            output.block_len,
            flags,
            head.as_mut_ptr(),
          );
        }
        block_counter = block_counter.wrapping_add(4);
        out = rest;
      }
    }
  }

  while !out.is_empty() {
    let words = portable::compress(
      &output.input_chaining_value,
      &output.block_words,
      block_counter,
      output.block_len,
      flags,
    );
    let (head, rest) = out.split_at_mut(OUTPUT_BLOCK_LEN);
    store_words16_le(&words, head);
    block_counter = block_counter.wrapping_add(1);
    out = rest;
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot paths
// ─────────────────────────────────────────────────────────────────────────────

/// Output state for an input that fits in a single chunk.
fn single_chunk_output(key_words: &[u32; 8], chunk_counter: u64, flags: u32, input: &[u8]) -> OutputState {
  debug_assert!(input.len() <= CHUNK_LEN);

  // The empty input is a single zero-length block; otherwise every block
  // except the last is compressed eagerly.
  let full_blocks = if input.is_empty() { 0 } else { (input.len() - 1) / BLOCK_LEN };
  let mut cv = *key_words;
  let mut blocks_compressed = 0u8;
  portable::compress_chunk_blocks(
    &mut cv,
    chunk_counter,
    flags,
    &mut blocks_compressed,
    &input[..full_blocks * BLOCK_LEN],
  );

  let tail = &input[full_blocks * BLOCK_LEN..];
  let mut block = [0u8; BLOCK_LEN];
  block[..tail.len()].copy_from_slice(tail);
  let start = if blocks_compressed == 0 { CHUNK_START } else { 0 };

  OutputState {
    input_chaining_value: cv,
    block_words: words16_from_le(&block),
    counter: chunk_counter,
    block_len: tail.len() as u32,
    flags: flags | start | CHUNK_END,
  }
}

fn oneshot_output(key_words: [u32; 8], flags: u32, input: &[u8]) -> OutputState {
  if input.len() <= CHUNK_LEN {
    return single_chunk_output(&key_words, 0, flags, input);
  }
  let mut hasher = Blake3::new_internal(key_words, flags);
  hasher.update(input);
  hasher.root_output()
}

pub(crate) fn hash_oneshot(input: &[u8]) -> [u8; OUT_LEN] {
  oneshot_output(IV, 0, input).root_hash_bytes()
}

pub(crate) fn xof_oneshot(input: &[u8]) -> Blake3Xof {
  Blake3Xof::new(oneshot_output(IV, 0, input))
}

pub(crate) fn keyed_hash_oneshot(key: &[u8; KEY_LEN], input: &[u8]) -> [u8; OUT_LEN] {
  oneshot_output(words8_from_le(key), KEYED_HASH, input).root_hash_bytes()
}

pub(crate) fn keyed_xof_oneshot(key: &[u8; KEY_LEN], input: &[u8]) -> Blake3Xof {
  Blake3Xof::new(oneshot_output(words8_from_le(key), KEYED_HASH, input))
}

pub(crate) fn derive_key_oneshot(context: &str, key_material: &[u8]) -> [u8; OUT_LEN] {
  let context_cv = oneshot_output(IV, DERIVE_KEY_CONTEXT, context.as_bytes()).root_hash_words();
  oneshot_output(context_cv, DERIVE_KEY_MATERIAL, key_material).root_hash_bytes()
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming hasher
// ─────────────────────────────────────────────────────────────────────────────

/// Incremental BLAKE3 hasher.
///
/// Construct with [`Digest::new`] for plain hashing, [`Blake3::new_keyed`]
/// for the keyed mode, or [`Blake3::new_derive_key`] for key derivation.
/// `finalize` (and [`Blake3::finalize_xof`]) never consume or alter state, so
/// a hasher can be finalized repeatedly and updated afterwards.
#[derive(Clone, Debug)]
pub struct Blake3 {
  key_words: [u32; 8],
  chunk_state: ChunkState,
  cv_stack: [[u32; 8]; STACK_DEPTH],
  cv_stack_len: u8,
  flags: u32,
}

impl Blake3 {
  #[inline]
  fn new_internal(key_words: [u32; 8], flags: u32) -> Self {
    Self {
      key_words,
      chunk_state: ChunkState::new(key_words, 0, flags),
      cv_stack: [[0u32; 8]; STACK_DEPTH],
      cv_stack_len: 0,
      flags,
    }
  }

  /// Construct a new hasher for the keyed hash function.
  #[inline]
  #[must_use]
  pub fn new_keyed(key: &[u8; KEY_LEN]) -> Self {
    Self::new_internal(words8_from_le(key), KEYED_HASH)
  }

  /// Construct a new keyed hasher from a key slice.
  ///
  /// # Errors
  /// Returns [`InvalidKeyLength`] unless `key` is exactly [`KEY_LEN`] bytes.
  #[inline]
  pub fn new_keyed_from_slice(key: &[u8]) -> Result<Self, InvalidKeyLength> {
    match <&[u8; KEY_LEN]>::try_from(key) {
      Ok(key) => Ok(Self::new_keyed(key)),
      Err(_) => Err(InvalidKeyLength::new()),
    }
  }

  /// Construct a new hasher for the key derivation function.
  ///
  /// `context` should be a hardcoded, globally unique application string; the
  /// derived context key becomes this hasher's initial chaining value.
  #[inline]
  #[must_use]
  pub fn new_derive_key(context: &str) -> Self {
    let context_cv = oneshot_output(IV, DERIVE_KEY_CONTEXT, context.as_bytes()).root_hash_words();
    Self::new_internal(context_cv, DERIVE_KEY_MATERIAL)
  }

  /// Finalize into an extendable output reader.
  ///
  /// Like `finalize`, this does not consume or alter the hasher.
  #[must_use]
  pub fn finalize_xof(&self) -> Blake3Xof {
    Blake3Xof::new(self.root_output())
  }

  #[inline]
  fn push_stack(&mut self, cv: [u32; 8]) {
    self.cv_stack[self.cv_stack_len as usize] = cv;
    self.cv_stack_len = self.cv_stack_len.wrapping_add(1);
  }

  #[inline]
  fn pop_stack(&mut self) -> [u32; 8] {
    self.cv_stack_len = self.cv_stack_len.wrapping_sub(1);
    self.cv_stack[self.cv_stack_len as usize]
  }

  /// Commit a completed chunk's CV, merging completed subtrees.
  ///
  /// `total_chunks` counts chunks consumed so far including this one; its
  /// trailing zeros equal the number of same-size subtree pairs that are now
  /// complete and ready to merge.
  fn push_chunk_cv(&mut self, cv: [u32; 8], total_chunks: u64) {
    let mut cv = cv;
    let mut total_chunks = total_chunks;
    while total_chunks & 1 == 0 {
      let left = self.pop_stack();
      cv = portable::parent_cv(&left, &cv, &self.key_words, self.flags);
      total_chunks >>= 1;
    }
    self.push_stack(cv);
  }

  /// Collapse the stack over the terminal chunk into the root output state.
  fn root_output(&self) -> OutputState {
    let mut output = self.chunk_state.output();
    for left in self.cv_stack[..self.cv_stack_len as usize].iter().rev() {
      output = parent_output(left, &output.chaining_value(), &self.key_words, self.flags);
    }
    output
  }
}

impl Default for Blake3 {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Digest for Blake3 {
  const OUTPUT_SIZE: usize = OUT_LEN;
  type Output = [u8; OUT_LEN];

  #[inline]
  fn new() -> Self {
    Self::new_internal(IV, 0)
  }

  fn update(&mut self, mut input: &[u8]) {
    while !input.is_empty() {
      // A full buffered chunk with more input arriving can no longer be the
      // terminal chunk; commit its CV to the tree.
      if self.chunk_state.len() == CHUNK_LEN {
        let chunk_cv = self.chunk_state.output().chaining_value();
        let total_chunks = self.chunk_state.chunk_counter + 1;
        self.push_chunk_cv(chunk_cv, total_chunks);
        self.chunk_state = ChunkState::new(self.key_words, total_chunks, self.flags);
      }

      // Chunk-aligned bulk path: hash whole chunks through the active kernel.
      // The run containing the final byte is always held back so `finalize`
      // can treat it as the terminal chunk.
      if self.chunk_state.len() == 0 && input.len() > CHUNK_LEN {
        let kernel = dispatch::active_kernel();
        while input.len() > CHUNK_LEN {
          let committable = (input.len() - 1) / CHUNK_LEN;
          let batch = committable.min(kernel.simd_degree);
          let bytes = batch * CHUNK_LEN;
          let base = self.chunk_state.chunk_counter;

          let mut cvs = [0u8; MAX_SIMD_DEGREE * OUT_LEN];
          (kernel.hash_chunks)(&input[..bytes], &self.key_words, base, self.flags, &mut cvs[..batch * OUT_LEN]);

          for i in 0..batch {
            let mut cv_bytes = [0u8; OUT_LEN];
            cv_bytes.copy_from_slice(&cvs[i * OUT_LEN..(i + 1) * OUT_LEN]);
            self.push_chunk_cv(words8_from_le(&cv_bytes), base + i as u64 + 1);
          }

          self.chunk_state = ChunkState::new(self.key_words, base + batch as u64, self.flags);
          input = &input[bytes..];
        }
      }

      // Buffer (the rest of) the current chunk.
      let want = CHUNK_LEN - self.chunk_state.len();
      let take = want.min(input.len());
      self.chunk_state.update(&input[..take]);
      input = &input[take..];
    }
  }

  #[inline]
  fn finalize(&self) -> Self::Output {
    self.root_output().root_hash_bytes()
  }

  #[inline]
  fn reset(&mut self) {
    *self = Self::new_internal(self.key_words, self.flags);
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extendable output reader
// ─────────────────────────────────────────────────────────────────────────────

/// BLAKE3 extendable output reader.
///
/// Successive [`Xof::squeeze`] calls continue one output stream; how the
/// stream is sliced across calls does not change its contents.
#[derive(Clone)]
pub struct Blake3Xof {
  output: OutputState,
  block_counter: u64,
  buf: [u8; OUTPUT_BLOCK_LEN],
  buf_pos: usize,
}

impl Blake3Xof {
  #[inline]
  fn new(output: OutputState) -> Self {
    Self {
      output,
      block_counter: 0,
      buf: [0u8; OUTPUT_BLOCK_LEN],
      buf_pos: OUTPUT_BLOCK_LEN,
    }
  }

  #[inline]
  fn refill(&mut self) {
    fill_output_blocks(&self.output, self.block_counter, &mut self.buf);
    self.block_counter = self.block_counter.wrapping_add(1);
    self.buf_pos = 0;
  }
}

impl Xof for Blake3Xof {
  fn squeeze(&mut self, mut out: &mut [u8]) {
    // Drain buffered bytes first.
    if self.buf_pos != OUTPUT_BLOCK_LEN && !out.is_empty() {
      let take = (OUTPUT_BLOCK_LEN - self.buf_pos).min(out.len());
      let (head, rest) = out.split_at_mut(take);
      head.copy_from_slice(&self.buf[self.buf_pos..self.buf_pos + take]);
      self.buf_pos += take;
      out = rest;
    }

    // Whole output blocks go straight into the caller's buffer.
    let whole = out.len() - out.len() % OUTPUT_BLOCK_LEN;
    if whole != 0 {
      let (head, rest) = out.split_at_mut(whole);
      fill_output_blocks(&self.output, self.block_counter, head);
      self.block_counter = self.block_counter.wrapping_add((whole / OUTPUT_BLOCK_LEN) as u64);
      out = rest;
    }

    // Tail: generate one block into the internal buffer and hand out a prefix.
    if !out.is_empty() {
      self.refill();
      let take = out.len();
      out.copy_from_slice(&self.buf[..take]);
      self.buf_pos = take;
    }
  }
}

#[cfg(test)]
mod tests {
  extern crate alloc;

  use alloc::vec;
  use alloc::vec::Vec;

  use super::*;

  fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
  }

  #[test]
  fn chunk_state_buffers_final_block() {
    let mut state = ChunkState::new(IV, 0, 0);
    state.update(&pattern(CHUNK_LEN));
    // 15 compressed blocks, one full block buffered.
    assert_eq!(state.blocks_compressed, 15);
    assert_eq!(state.block_len as usize, BLOCK_LEN);
    assert_eq!(state.len(), CHUNK_LEN);
  }

  #[test]
  fn chunk_state_split_feeds_match() {
    let data = pattern(CHUNK_LEN);
    for split in [1usize, 63, 64, 65, 512, 1023] {
      let mut whole = ChunkState::new(IV, 3, 0);
      whole.update(&data);

      let mut parts = ChunkState::new(IV, 3, 0);
      parts.update(&data[..split]);
      parts.update(&data[split..]);

      assert_eq!(whole.output().chaining_value(), parts.output().chaining_value(), "split={split}");
    }
  }

  #[test]
  fn stack_depth_matches_popcount() {
    let mut h = Blake3::new();
    // 13 = 0b1101 chunks committed, one more buffered.
    h.update(&pattern(14 * CHUNK_LEN));
    assert_eq!(h.cv_stack_len, 13u64.count_ones() as u8);
    assert_eq!(h.chunk_state.chunk_counter, 13);
    assert_eq!(h.chunk_state.len(), CHUNK_LEN);
  }

  #[test]
  fn oneshot_matches_streaming_across_boundaries() {
    for len in [0usize, 1, 63, 64, 65, 1023, 1024, 1025, 2048, 2049, 3072, 5000] {
      let data = pattern(len);
      let oneshot = hash_oneshot(&data);
      let mut h = Blake3::new();
      h.update(&data);
      assert_eq!(h.finalize(), oneshot, "len={len}");
    }
  }

  #[test]
  fn xof_prefix_is_digest() {
    let data = pattern(2049);
    let digest = hash_oneshot(&data);

    let mut xof = xof_oneshot(&data);
    let mut out = [0u8; 96];
    xof.squeeze(&mut out);
    assert_eq!(out[..32], digest);
  }

  #[test]
  fn xof_split_squeezes_concatenate() {
    let data = pattern(300);
    let mut expected = vec![0u8; 301];
    xof_oneshot(&data).squeeze(&mut expected);

    for split in [0usize, 1, 31, 64, 65, 128, 300] {
      let mut xof = xof_oneshot(&data);
      let mut actual = vec![0u8; 301];
      let (a, b) = actual.split_at_mut(split);
      xof.squeeze(a);
      xof.squeeze(b);
      assert_eq!(actual, expected, "split={split}");
    }
  }

  #[test]
  fn finalize_is_repeatable_and_nondestructive() {
    let mut h = Blake3::new();
    h.update(&pattern(1500));
    let first = h.finalize();
    assert_eq!(h.finalize(), first);

    h.update(&pattern(1));
    assert_ne!(h.finalize(), first);
  }

  #[test]
  fn keyed_from_slice_validates_length() {
    assert!(Blake3::new_keyed_from_slice(&[0u8; 32]).is_ok());
    assert_eq!(Blake3::new_keyed_from_slice(&[0u8; 31]).unwrap_err(), InvalidKeyLength::new());
    assert_eq!(Blake3::new_keyed_from_slice(&[0u8; 33]).unwrap_err(), InvalidKeyLength::new());
    assert_eq!(Blake3::new_keyed_from_slice(&[]).unwrap_err(), InvalidKeyLength::new());
  }

  #[test]
  fn modes_produce_distinct_digests() {
    let data = pattern(100);
    let key = [7u8; 32];
    let plain = hash_oneshot(&data);
    let keyed = keyed_hash_oneshot(&key, &data);
    let derived = derive_key_oneshot("b3 hasher test context", &data);
    assert_ne!(plain, keyed);
    assert_ne!(plain, derived);
    assert_ne!(keyed, derived);
  }
}
