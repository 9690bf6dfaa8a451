use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot latch for automatic prefetching.
///
/// The owner (typically a view) keeps one latch for its lifetime; however many
/// times it asks, only the first `try_fire` returns true.
#[derive(Debug, Default)]
pub struct PrefetchOnce {
  fired: AtomicBool,
}

impl PrefetchOnce {
  pub fn new() -> Self {
    Self::default()
  }

  /// Flip the latch. Returns true only for the first caller.
  pub fn try_fire(&self) -> bool {
    !self.fired.swap(true, Ordering::AcqRel)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fires_once() {
    let latch = PrefetchOnce::new();
    assert!(latch.try_fire());
    assert!(!latch.try_fire());
    assert!(!latch.try_fire());
  }
}
