//! The dispatched kernels and the portable fallback must produce identical
//! output through the whole public API.
//!
//! This lives in its own integration test binary because the caps override is
//! process-global.

use traits::{Digest as _, Xof as _};

const KEY: &[u8; 32] = b"whats the Elvish word for friend";
const CONTEXT: &str = "BLAKE3 2019-12-27 16:29:52 test vectors context";

fn pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i % 251) as u8).collect()
}

#[derive(Debug, PartialEq)]
struct ModeResults {
  plain: [u8; 32],
  plain_streamed: [u8; 32],
  keyed: [u8; 32],
  derived: [u8; 32],
  xof: Vec<u8>,
}

fn run_all_modes(len: usize) -> ModeResults {
  let data = pattern(len);

  let mut streamed = b3::Blake3::new();
  for part in data.chunks(997) {
    streamed.update(part);
  }

  let mut xof = vec![0u8; 300];
  b3::xof(&data).squeeze(&mut xof);

  ModeResults {
    plain: b3::hash(&data),
    plain_streamed: streamed.finalize(),
    keyed: b3::keyed_hash(KEY, &data),
    derived: b3::derive_key(CONTEXT, &data),
    xof,
  }
}

#[test]
fn portable_fallback_matches_dispatched_kernels() {
  let lens = [0usize, 1, 63, 64, 65, 1023, 1024, 1025, 4095, 4096, 4097, 16384, 65537];

  let dispatched: Vec<ModeResults> = lens.iter().map(|&len| run_all_modes(len)).collect();

  platform::set_caps_override(Some(platform::Caps::NONE));
  let portable: Vec<ModeResults> = lens.iter().map(|&len| run_all_modes(len)).collect();
  platform::set_caps_override(None);

  for ((len, dispatched), portable) in lens.iter().zip(&dispatched).zip(&portable) {
    assert_eq!(dispatched, portable, "len={len}");
  }
}
