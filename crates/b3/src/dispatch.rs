//! Runtime kernel selection.

use platform::Caps;

use crate::kernels::{ALL, Kernel, KernelId, kernel, required_caps};

/// Select the widest kernel the detected CPU supports.
///
/// `platform::caps()` caches detection, so this is an atomic load plus a
/// short scan. Resolving per call (rather than caching the resolved id) keeps
/// `platform::set_caps_override` effective for tests.
#[inline]
#[must_use]
pub(crate) fn active_kernel() -> Kernel {
  kernel(resolve(platform::caps()))
}

#[inline]
#[must_use]
fn resolve(caps: Caps) -> KernelId {
  let mut best = KernelId::Portable;
  for &id in ALL {
    if id.simd_degree() > best.simd_degree() && caps.has(required_caps(id)) {
      best = id;
    }
  }
  best
}
