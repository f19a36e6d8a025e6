#![no_main]

use libfuzzer_sys::fuzz_target;
use traits::Xof as _;

fn parse_u16_le(input: &[u8]) -> u16 {
  match input.len() {
    0 => 0,
    1 => input[0] as u16,
    _ => u16::from_le_bytes([input[0], input[1]]),
  }
}

fuzz_target!(|data: &[u8]| {
  assert_eq!(b3::hash(data), *blake3::hash(data).as_bytes());

  // Keyed hash mode.
  {
    let key_bytes = data.get(..32).unwrap_or(data);
    let mut key = [0u8; 32];
    key[..key_bytes.len()].copy_from_slice(key_bytes);

    assert_eq!(b3::keyed_hash(&key, data), *blake3::keyed_hash(&key, data).as_bytes());
  }

  // Derive-key mode (ASCII context to guarantee valid UTF-8).
  {
    let ctx_len = (data.first().copied().unwrap_or(0) as usize) % 65;
    let ctx_src = data.get(32..).unwrap_or(&[]);
    let ctx_len = ctx_len.min(ctx_src.len());
    let mut context = String::with_capacity(ctx_len);
    for &b in &ctx_src[..ctx_len] {
      context.push((b'a' + (b % 26)) as char);
    }

    assert_eq!(b3::derive_key(&context, data), blake3::derive_key(&context, data));
  }

  // XOF with split squeezes.
  let out_len = (parse_u16_le(data) as usize) % 2049;
  let split = if out_len == 0 {
    0usize
  } else {
    data.get(2).copied().unwrap_or(0) as usize % (out_len + 1)
  };

  let mut ours = vec![0u8; out_len];
  {
    let mut xof = b3::xof(data);
    let (a, b) = ours.split_at_mut(split);
    xof.squeeze(a);
    xof.squeeze(b);
  }

  let mut expected = vec![0u8; out_len];
  {
    let mut h = blake3::Hasher::new();
    h.update(data);
    let mut reader = h.finalize_xof();
    reader.fill(&mut expected[..split]);
    reader.fill(&mut expected[split..]);
  }
  assert_eq!(ours, expected);
});
