//! Kernel table.
//!
//! A kernel bundles the whole-chunk hashing entry point with its SIMD degree.
//! Single-block compression always goes through the scalar compressor; the
//! kernels only accelerate the throughput paths (many whole chunks, bulk XOF
//! output).

use platform::Caps;
#[cfg(target_arch = "x86_64")]
use platform::caps::x86;

use crate::portable;

/// Widest lane count any kernel in this crate uses.
pub(crate) const MAX_SIMD_DEGREE: usize = 4;

/// Hash whole contiguous chunks.
///
/// `input` holds `input.len() / CHUNK_LEN` complete chunks; one `OUT_LEN`-byte
/// chaining value per chunk is written to `out`. The chunk counter starts at
/// `counter` and increments per chunk.
pub(crate) type HashChunksFn = fn(input: &[u8], key_words: &[u32; 8], counter: u64, flags: u32, out: &mut [u8]);

#[derive(Clone, Copy)]
pub(crate) struct Kernel {
  pub(crate) id: KernelId,
  pub(crate) hash_chunks: HashChunksFn,
  /// Chunks processed per hardware pass: 1 for portable, 4 for SSE4.1.
  pub(crate) simd_degree: usize,
  #[allow(dead_code)] // Debug/bench introspection.
  pub(crate) name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum KernelId {
  Portable = 0,
  #[cfg(target_arch = "x86_64")]
  X86Sse41 = 1,
}

pub(crate) const ALL: &[KernelId] = &[
  KernelId::Portable,
  #[cfg(target_arch = "x86_64")]
  KernelId::X86Sse41,
];

impl KernelId {
  #[inline]
  #[must_use]
  pub(crate) const fn as_str(self) -> &'static str {
    match self {
      Self::Portable => "portable",
      #[cfg(target_arch = "x86_64")]
      Self::X86Sse41 => "x86_64/sse4.1",
    }
  }

  #[inline]
  #[must_use]
  pub(crate) const fn simd_degree(self) -> usize {
    match self {
      Self::Portable => 1,
      #[cfg(target_arch = "x86_64")]
      Self::X86Sse41 => 4,
    }
  }
}

/// CPU features a kernel needs before dispatch may select it.
#[inline]
#[must_use]
pub(crate) const fn required_caps(id: KernelId) -> Caps {
  match id {
    KernelId::Portable => Caps::NONE,
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Sse41 => x86::SSE41.union(x86::SSSE3),
  }
}

#[must_use]
pub(crate) fn kernel(id: KernelId) -> Kernel {
  match id {
    KernelId::Portable => Kernel {
      id,
      hash_chunks: portable::hash_chunks,
      simd_degree: 1,
      name: id.as_str(),
    },
    #[cfg(target_arch = "x86_64")]
    KernelId::X86Sse41 => Kernel {
      id,
      hash_chunks: hash_chunks_sse41,
      simd_degree: 4,
      name: id.as_str(),
    },
  }
}

#[cfg(target_arch = "x86_64")]
fn hash_chunks_sse41(input: &[u8], key_words: &[u32; 8], counter: u64, flags: u32, out: &mut [u8]) {
  // SAFETY: dispatch only selects this kernel when SSE4.1 and SSSE3 are
  // available (see `required_caps`).
  unsafe { crate::x86_64::sse41::hash_chunks(input, key_words, counter, flags, out) }
}
