//! Streaming invariants: incremental equivalence, reset, clone, extension.

use traits::{Digest as _, Xof as _};

const KEY: &[u8; 32] = b"whats the Elvish word for friend";

fn pattern(len: usize) -> Vec<u8> {
  (0..len).map(|i| (i % 251) as u8).collect()
}

// Lengths that land on and around block, chunk, and subtree boundaries.
const BOUNDARY_LENS: &[usize] = &[
  0, 1, 63, 64, 65, 127, 128, 1023, 1024, 1025, 2047, 2048, 2049, 3072, 4095, 4096, 4097, 8192, 16384, 16385,
];

#[test]
fn incremental_equivalence_fixed_piece_sizes() {
  for &len in BOUNDARY_LENS {
    let data = pattern(len);
    let expected = b3::hash(&data);

    for &piece in &[1usize, 7, 31, 32, 63, 64, 65, 256, 1023, 1024, 1025, 4096] {
      let mut h = b3::Blake3::new();
      for part in data.chunks(piece) {
        h.update(part);
      }
      assert_eq!(h.finalize(), expected, "len={len} piece={piece}");
    }
  }
}

#[test]
fn incremental_equivalence_uneven_partitions() {
  let data = pattern(5000);
  let expected = b3::hash(&data);

  // Partitions that split a block, a chunk, and a subtree merge point.
  let cuts: &[&[usize]] = &[
    &[1, 2, 3],
    &[63, 64, 65],
    &[1023, 1024, 1025],
    &[2048, 2049],
    &[4095, 4096, 4097],
    &[32, 1000, 1024, 3000],
  ];

  for cut_list in cuts {
    let mut h = b3::Blake3::new();
    let mut prev = 0usize;
    for &cut in *cut_list {
      h.update(&data[prev..cut]);
      prev = cut;
    }
    h.update(&data[prev..]);
    assert_eq!(h.finalize(), expected, "cuts={cut_list:?}");
  }
}

#[test]
fn empty_updates_are_noops() {
  let data = pattern(1500);
  let mut h = b3::Blake3::new();
  h.update(b"");
  h.update(&data[..700]);
  h.update(b"");
  h.update(&data[700..]);
  h.update(b"");
  assert_eq!(h.finalize(), b3::hash(&data));
}

#[test]
fn update_vectored_matches_contiguous() {
  let data = pattern(3000);
  let mut h = b3::Blake3::new();
  h.update_vectored(&[&data[..100], &data[100..1500], &data[1500..]]);
  assert_eq!(h.finalize(), b3::hash(&data));
}

#[test]
fn reset_restores_initial_state() {
  let a = pattern(4097);
  let b = pattern(129);

  let mut h = b3::Blake3::new();
  h.update(&a);
  h.reset();
  h.update(&b);
  assert_eq!(h.finalize(), b3::hash(&b));
}

#[test]
fn reset_preserves_keyed_mode() {
  let a = pattern(2048);
  let b = pattern(70);

  let mut h = b3::Blake3::new_keyed(KEY);
  h.update(&a);
  h.reset();
  h.update(&b);
  assert_eq!(h.finalize(), b3::keyed_hash(KEY, &b));
}

#[test]
fn clone_is_independent() {
  let data = pattern(1500);
  let mut h = b3::Blake3::new();
  h.update(&data);
  let before = h.finalize();

  let mut g = h.clone();
  assert_eq!(g.finalize(), before);

  g.update(&pattern(100));
  assert_eq!(h.finalize(), before);
  assert_ne!(g.finalize(), before);

  // The original keeps working independently of the mutated clone.
  h.update(b"x");
  let mut expected = data;
  expected.push(b'x');
  assert_eq!(h.finalize(), b3::hash(&expected));
}

#[test]
fn finalize_then_continue_updating() {
  let data = pattern(2500);
  let mut h = b3::Blake3::new();
  h.update(&data[..1999]);
  let partial = h.finalize();
  assert_eq!(partial, b3::hash(&data[..1999]));

  h.update(&data[1999..]);
  assert_eq!(h.finalize(), b3::hash(&data));
}

#[test]
fn output_extension_is_prefix_stable() {
  for &len in &[0usize, 1, 1024, 1025, 4097] {
    let data = pattern(len);

    let mut long = vec![0u8; 1312];
    b3::xof(&data).squeeze(&mut long);

    for &n in &[0usize, 1, 31, 32, 33, 64, 65, 128, 500, 1311] {
      let mut short = vec![0u8; n];
      b3::xof(&data).squeeze(&mut short);
      assert_eq!(short, long[..n], "len={len} n={n}");
    }
  }
}

#[test]
fn finalize_xof_is_repeatable() {
  let mut h = b3::Blake3::new();
  h.update(&pattern(3073));

  let mut a = [0u8; 100];
  h.finalize_xof().squeeze(&mut a);
  let mut b = [0u8; 100];
  h.finalize_xof().squeeze(&mut b);
  assert_eq!(a, b);

  // Finalizing must not disturb the streaming state.
  assert_eq!(h.finalize(), b3::hash(&pattern(3073)));
}

#[test]
fn squeeze_granularity_does_not_change_stream() {
  let data = pattern(1025);
  let mut expected = vec![0u8; 400];
  b3::xof(&data).squeeze(&mut expected);

  let mut xof = b3::xof(&data);
  let mut actual = vec![0u8; 400];
  let mut filled = 0usize;
  let mut step = 1usize;
  while filled < actual.len() {
    let take = step.min(actual.len() - filled);
    xof.squeeze(&mut actual[filled..filled + take]);
    filled += take;
    step = step * 2 + 1;
  }
  assert_eq!(actual, expected);
}
