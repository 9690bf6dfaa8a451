//! Cache keys.

use std::fmt;

/// Composite cache key: a resource kind plus an optional scope (e.g. a
/// project ref).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  kind: &'static str,
  scope: Option<String>,
}

impl CacheKey {
  /// Key for a whole collection of a resource kind.
  pub const fn new(kind: &'static str) -> Self {
    Self { kind, scope: None }
  }

  /// Key for one scoped member of a resource kind.
  pub fn scoped(kind: &'static str, scope: impl Into<String>) -> Self {
    Self {
      kind,
      scope: Some(scope.into()),
    }
  }

  /// Whether this key falls under `filter`.
  ///
  /// Kinds must be equal. An unscoped filter matches every scope of its kind,
  /// a scoped filter matches only that scope.
  pub fn matches(&self, filter: &CacheKey) -> bool {
    self.kind == filter.kind
      && match &filter.scope {
        Some(scope) => self.scope.as_ref() == Some(scope),
        None => true,
      }
  }

  /// Human-readable description for logs
  pub fn description(&self) -> String {
    match &self.scope {
      Some(scope) => format!("{} {}", self.kind, scope),
      None => format!("all {}", self.kind),
    }
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.scope {
      Some(scope) => write!(f, "{}:{}", self.kind, scope),
      None => f.write_str(self.kind),
    }
  }
}
