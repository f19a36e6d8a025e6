//! Error types for hashing operations.
//!
//! The hash cores are total over well-typed inputs; the only failures live at
//! the construction boundary. Individual crates may define additional errors
//! as needed.

use core::fmt;

/// A keyed constructor was given a key of the wrong size.
///
/// Returned by slice-based keyed constructors when the provided key is not
/// exactly the algorithm's key length. The fixed-size-array constructors are
/// infallible and should be preferred where the length is statically known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct InvalidKeyLength;

impl InvalidKeyLength {
  /// Create a new invalid-key-length error.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self
  }
}

impl Default for InvalidKeyLength {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for InvalidKeyLength {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("invalid key length")
  }
}

impl core::error::Error for InvalidKeyLength {}

/// A requested output length exceeds an implementation-imposed cap.
///
/// Implementations that do not cap their output length never return this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct InvalidOutputLength;

impl InvalidOutputLength {
  /// Create a new invalid-output-length error.
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self
  }
}

impl Default for InvalidOutputLength {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for InvalidOutputLength {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("invalid output length")
  }
}

impl core::error::Error for InvalidOutputLength {}

#[cfg(test)]
mod tests {
  extern crate alloc;

  use alloc::{format, string::ToString};

  use super::*;

  #[test]
  fn display_messages() {
    assert_eq!(InvalidKeyLength::new().to_string(), "invalid key length");
    assert_eq!(InvalidOutputLength::new().to_string(), "invalid output length");
  }

  #[test]
  fn debug_impls() {
    assert_eq!(format!("{:?}", InvalidKeyLength::new()), "InvalidKeyLength");
    assert_eq!(format!("{:?}", InvalidOutputLength::new()), "InvalidOutputLength");
  }

  #[test]
  fn is_copy_and_eq() {
    let e = InvalidKeyLength::new();
    let e2 = e;
    let e3 = e;
    assert_eq!(e2, e3);
  }

  #[test]
  fn default_impls() {
    assert_eq!(InvalidKeyLength::default(), InvalidKeyLength::new());
    assert_eq!(InvalidOutputLength::default(), InvalidOutputLength::new());
  }

  #[test]
  fn error_trait_impls() {
    use core::error::Error;

    let err = InvalidKeyLength::new();
    assert!(err.source().is_none());
    let err = InvalidOutputLength::new();
    assert!(err.source().is_none());
  }

  #[test]
  fn trait_bounds() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    assert_send::<InvalidKeyLength>();
    assert_sync::<InvalidKeyLength>();
    assert_send::<InvalidOutputLength>();
    assert_sync::<InvalidOutputLength>();
  }

  #[test]
  fn sizes_are_zero() {
    assert_eq!(core::mem::size_of::<InvalidKeyLength>(), 0);
    assert_eq!(core::mem::size_of::<InvalidOutputLength>(), 0);
  }

  #[test]
  fn result_err_path() {
    fn check_key(key: &[u8]) -> Result<(), InvalidKeyLength> {
      if key.len() == 32 { Ok(()) } else { Err(InvalidKeyLength::new()) }
    }

    assert!(check_key(&[0u8; 32]).is_ok());
    let err = check_key(&[0u8; 31]).unwrap_err();
    assert_eq!(err, InvalidKeyLength::new());
  }
}
