//! Capability detection and caching.
//!
//! Detection merges compile-time features (`cfg!(target_feature)`) with
//! runtime detection where `std` is available. The detected value is cached in
//! a single atomic word; the override, when set, bypasses both.

use core::sync::atomic::{AtomicU64, Ordering};

use crate::caps::Caps;

// High bit marks a populated slot so `Caps::NONE` remains representable both
// as a cached detection result and as an override value.
const POPULATED: u64 = 1 << 63;

static CACHE: AtomicU64 = AtomicU64::new(0);
static OVERRIDE: AtomicU64 = AtomicU64::new(0);

#[inline]
pub(crate) fn caps() -> Caps {
  let ov = OVERRIDE.load(Ordering::Acquire);
  if ov & POPULATED != 0 {
    return Caps(ov & !POPULATED);
  }

  let cached = CACHE.load(Ordering::Relaxed);
  if cached & POPULATED != 0 {
    return Caps(cached & !POPULATED);
  }

  let detected = detect();
  // Redundant stores from racing threads are harmless: detection is
  // deterministic for the lifetime of the process.
  CACHE.store(detected.0 | POPULATED, Ordering::Relaxed);
  detected
}

#[inline]
pub(crate) fn set_caps_override(value: Option<Caps>) {
  match value {
    Some(caps) => OVERRIDE.store(caps.0 | POPULATED, Ordering::Release),
    None => OVERRIDE.store(0, Ordering::Release),
  }
}

#[inline]
pub(crate) fn has_override() -> bool {
  OVERRIDE.load(Ordering::Acquire) & POPULATED != 0
}

fn detect() -> Caps {
  // Miri interprets SIMD intrinsics poorly; report portable-only.
  if cfg!(miri) {
    return Caps::NONE;
  }

  static_caps().union(runtime_caps())
}

/// Features guaranteed by the compilation target.
fn static_caps() -> Caps {
  #[allow(unused_mut)]
  let mut caps = Caps::NONE;

  #[cfg(target_arch = "x86_64")]
  {
    use crate::caps::x86;

    if cfg!(target_feature = "ssse3") {
      caps |= x86::SSSE3;
    }
    if cfg!(target_feature = "sse4.1") {
      caps |= x86::SSE41;
    }
  }

  #[cfg(target_arch = "aarch64")]
  {
    use crate::caps::aarch64;

    if cfg!(target_feature = "neon") {
      caps |= aarch64::NEON;
    }
  }

  caps
}

/// Features detected at runtime, beyond the compile-time baseline.
#[cfg(all(feature = "std", target_arch = "x86_64"))]
fn runtime_caps() -> Caps {
  use crate::caps::x86;

  let mut caps = Caps::NONE;
  if std::arch::is_x86_feature_detected!("ssse3") {
    caps |= x86::SSSE3;
  }
  if std::arch::is_x86_feature_detected!("sse4.1") {
    caps |= x86::SSE41;
  }
  caps
}

#[cfg(all(feature = "std", target_arch = "aarch64"))]
fn runtime_caps() -> Caps {
  use crate::caps::aarch64;

  let mut caps = Caps::NONE;
  if std::arch::is_aarch64_feature_detected!("neon") {
    caps |= aarch64::NEON;
  }
  caps
}

#[cfg(not(all(feature = "std", any(target_arch = "x86_64", target_arch = "aarch64"))))]
fn runtime_caps() -> Caps {
  Caps::NONE
}

#[cfg(test)]
mod tests {
  use super::*;

  // Single test: the override slot is process-global, so exercising it from
  // parallel test threads would race.
  #[test]
  fn override_and_detection() {
    set_caps_override(Some(Caps::NONE));
    assert!(has_override());
    assert!(caps().is_empty());

    set_caps_override(Some(Caps(0b11)));
    assert_eq!(caps(), Caps(0b11));

    set_caps_override(None);
    assert!(!has_override());
    // Detection result must at least contain the compile-time features,
    // and repeated queries must agree.
    assert!(caps().has(static_caps()));
    assert_eq!(caps(), caps());
  }
}
