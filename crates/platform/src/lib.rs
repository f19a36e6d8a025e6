//! CPU feature detection for the b3 workspace.
//!
//! This crate is the single source of truth for CPU feature detection across
//! the workspace. Kernel selection queries [`caps()`] instead of doing ad-hoc
//! detection.
//!
//! # Core Type
//!
//! - [`Caps`]: what instructions can run on this machine
//!
//! # Detection
//!
//! Compile-time features are detected via `cfg!(target_feature)`, avoiding
//! runtime overhead. With the `std` feature, runtime detection extends the
//! compile-time set (`is_x86_feature_detected!` on x86_64,
//! `is_aarch64_feature_detected!` on aarch64); the result is cached in an
//! atomic so `no_std` builds work identically. Under Miri,
//! detection always reports no SIMD features so interpreted runs stay on the
//! portable kernels.
//!
//! # Overrides
//!
//! [`set_caps_override`] replaces the detected capabilities, which is useful
//! for forcing the portable fallback in tests or pinning features on bare
//! metal:
//!
//! ```
//! platform::set_caps_override(Some(platform::Caps::NONE));
//! assert!(platform::caps().is_empty());
//! platform::set_caps_override(None);
//! ```
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod caps;
mod detect;

pub use caps::Caps;

/// Get the detected CPU capabilities.
///
/// An override set via [`set_caps_override`] takes precedence over detection.
#[inline]
#[must_use]
pub fn caps() -> Caps {
  detect::caps()
}

/// Set or clear the capabilities override.
///
/// When set, [`caps()`] returns the override value instead of detecting. Pass
/// `None` to clear the override and resume detection. Thread-safe, but callers
/// that race this against hashing on other threads get whichever value each
/// hash call observes.
#[inline]
pub fn set_caps_override(value: Option<Caps>) {
  detect::set_caps_override(value);
}

/// Check if an override is currently set.
#[inline]
#[must_use]
pub fn has_override() -> bool {
  detect::has_override()
}
