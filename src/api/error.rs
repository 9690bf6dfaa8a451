//! Error types for remote calls and cached fetches.

use thiserror::Error;

/// A failed call against the platform API.
///
/// Errors are `Clone` so that a single in-flight outcome can be handed to
/// every caller waiting on the same cache key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
  /// Network failure or non-success HTTP status. Not retried.
  #[error("request failed{}: {message}", status_suffix(.status))]
  Transport {
    status: Option<u16>,
    message: String,
  },
  /// The response body did not have the expected shape.
  #[error("failed to decode response: {0}")]
  Decode(String),
}

impl RemoteError {
  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport {
      status: None,
      message: message.into(),
    }
  }

  pub fn status(status: u16, message: impl Into<String>) -> Self {
    Self::Transport {
      status: Some(status),
      message: message.into(),
    }
  }
}

impl From<reqwest::Error> for RemoteError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return Self::Decode(err.to_string());
    }
    Self::Transport {
      status: err.status().map(|s| s.as_u16()),
      message: err.to_string(),
    }
  }
}

fn status_suffix(status: &Option<u16>) -> String {
  status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Outcome of a fetch that went through the cache store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
  #[error(transparent)]
  Remote(#[from] RemoteError),
  /// The fetch was abandoned before it settled. Nothing was cached.
  #[error("fetch was cancelled")]
  Cancelled,
}

impl FetchError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, FetchError::Cancelled)
  }
}
