//! Async query observer for views.
//!
//! Modeled on TanStack Query's observer: a `Query<T>` owns a fetcher,
//! tracks its state, and delivers results through a channel that the view
//! drains from its tick handler. The fetcher usually goes through the shared
//! cache, so observers of the same data do not duplicate network requests.
//!
//! # Example
//!
//! ```ignore
//! let projects = projects_query.clone();
//! let mut query = Query::new(move || {
//!     let projects = projects.clone();
//!     async move { projects.fetch().await }
//! })
//! .enabled(profile_ready);
//!
//! // Start fetching (no-op while disabled)
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!     QueryState::NotStarted => render_waiting(),
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

use crate::api::FetchError;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started (disabled, or never asked to fetch)
  NotStarted,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(FetchError),
}

impl<T> QueryState<T> {
  pub fn is_not_started(&self) -> bool {
    matches!(self, QueryState::NotStarted)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&FetchError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// A boxed future that returns a Result<T, FetchError>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query for data fetching with state management.
///
/// Query<T> encapsulates:
/// - The fetching logic (via a closure)
/// - An `enabled` gate that holds the query in `NotStarted`
/// - Loading/success/error states
/// - Async result handling via channels
///
/// Freshness is the cache's concern: a query only tracks its own fetch.
pub struct Query<T> {
  state: QueryState<T>,
  /// State to fall back to if the running fetch is cancelled
  previous: Option<QueryState<T>>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, FetchError>>>,
  enabled: bool,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is a closure that returns a future. It will be called
  /// each time `fetch()` or `refetch()` starts a request.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    Self {
      state: QueryState::NotStarted,
      previous: None,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      enabled: true,
    }
  }

  /// Set whether the query may fetch.
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  /// Open or close the gate. Opening it on a query that has not started
  /// kicks off the first fetch.
  pub fn set_enabled(&mut self, enabled: bool) {
    let was_enabled = self.enabled;
    self.enabled = enabled;
    if enabled && !was_enabled && self.state.is_not_started() {
      self.start_fetch();
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  /// Get the current state of the query.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  /// Get the data if the query succeeded.
  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  /// Check if the query is currently loading.
  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  /// Check if the query failed.
  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  /// Get the error if the query failed.
  pub fn error(&self) -> Option<&FetchError> {
    self.state.error()
  }

  /// Start fetching data if enabled and not already loading.
  pub fn fetch(&mut self) {
    if !self.enabled || self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  ///
  /// Still a no-op while the query is disabled.
  pub fn refetch(&mut self) {
    if !self.enabled {
      return;
    }
    // Stop listening to any pending fetch by dropping the receiver
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  /// Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.previous = None;
        self.receiver = None;
        true
      }
      Ok(Err(error)) if error.is_cancelled() => {
        self.restore_previous();
        true
      }
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.restore_previous();
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.previous = None;
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
    }
  }

  /// The fetch did not complete: go back to whatever we showed before
  fn restore_previous(&mut self) {
    self.state = self.previous.take().unwrap_or(QueryState::NotStarted);
    self.receiver = None;
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    let previous = std::mem::replace(&mut self.state, QueryState::Loading);
    if !previous.is_loading() {
      self.previous = Some(previous);
    }

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

// Query is not Clone because the fetcher is boxed and receiver is owned.
// If you need to share a query, wrap it in Arc<Mutex<Query<T>>>.

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("enabled", &self.enabled)
      .finish_non_exhaustive()
  }
}
