#![no_main]

use libfuzzer_sys::fuzz_target;
use traits::Digest as _;

// Split `data` into update calls whose sizes are driven by the data itself,
// and check the result against the one-shot path plus reset/clone invariants.
fuzz_target!(|data: &[u8]| {
  let expected = b3::hash(data);

  let mut h = b3::Blake3::new();
  let mut i = 0usize;
  while i < data.len() {
    let step = (data[i] as usize % 1031) + 1;
    let end = data.len().min(i + step);
    h.update(&data[i..end]);
    i = end;
  }
  assert_eq!(h.finalize(), expected);

  // Cloning must snapshot the state.
  let mut fork = h.clone();
  fork.update(b"fork");
  assert_eq!(h.finalize(), expected);
  assert_ne!(fork.finalize(), expected);

  // Reset must return to the empty-input state.
  h.reset();
  assert_eq!(h.finalize(), b3::hash(b""));
});
