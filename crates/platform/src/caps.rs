//! CPU capability bitset.
//!
//! `Caps` answers the question: "what instructions can I legally run on this
//! machine?" Each bit corresponds to one ISA extension. The bits are
//! architecture-specific but the API is uniform, so kernel tables can express
//! their requirements without `cfg` soup.

/// Compact CPU feature bitset.
///
/// A `u64` gives ample room for the features this workspace dispatches on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Caps(pub u64);

impl Caps {
  /// Empty bitset (portable only).
  pub const NONE: Self = Self(0);

  /// Check if all bits in `other` are set in `self`.
  #[inline]
  #[must_use]
  pub const fn has(self, other: Self) -> bool {
    (self.0 & other.0) == other.0
  }

  /// Union of two bitsets.
  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Intersection of two bitsets.
  #[inline]
  #[must_use]
  pub const fn intersection(self, other: Self) -> Self {
    Self(self.0 & other.0)
  }

  /// Create a bitset with a single bit set.
  #[inline]
  #[must_use]
  pub const fn from_bit(bit: u32) -> Self {
    Self(1u64 << bit)
  }

  /// Check if the bitset is empty.
  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }
}

impl core::ops::BitOr for Caps {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self::Output {
    self.union(rhs)
  }
}

impl core::ops::BitOrAssign for Caps {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

impl core::ops::BitAnd for Caps {
  type Output = Self;

  #[inline]
  fn bitand(self, rhs: Self) -> Self::Output {
    self.intersection(rhs)
  }
}

/// x86 / x86_64 feature bits.
pub mod x86 {
  use super::Caps;

  pub const SSSE3: Caps = Caps::from_bit(0);
  pub const SSE41: Caps = Caps::from_bit(1);
}

/// aarch64 feature bits.
pub mod aarch64 {
  use super::Caps;

  pub const NEON: Caps = Caps::from_bit(32);
}
