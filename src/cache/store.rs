//! In-memory keyed store with in-flight fetch de-duplication.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::api::error::FetchError;

/// A cached value and its freshness metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
  pub value: V,
  /// When the value was last written (fetch, set or patch)
  pub updated_at: DateTime<Utc>,
  /// Set by `invalidate`; forces the next read-or-fetch to go to the network
  pub invalidated: bool,
}

impl<V> CacheEntry<V> {
  fn new(value: V) -> Self {
    Self {
      value,
      updated_at: Utc::now(),
      invalidated: false,
    }
  }

  /// Whether this entry can no longer satisfy a read on its own.
  pub fn is_stale(&self, stale_time: Duration) -> bool {
    self.invalidated || Utc::now() - self.updated_at > stale_time
  }
}

type SharedFetch<V> = Shared<BoxFuture<'static, Result<CacheEntry<V>, FetchError>>>;

struct InFlight<V> {
  id: u64,
  token: CancellationToken,
  fetch: SharedFetch<V>,
}

struct Inner<K, V> {
  entries: Mutex<HashMap<K, CacheEntry<V>>>,
  // Lock order: in_flight before entries
  in_flight: Mutex<HashMap<K, InFlight<V>>>,
  next_fetch_id: AtomicU64,
}

/// Process-wide query cache.
///
/// Cloning is cheap and every clone shares the same entries, so one store is
/// created at startup and handed to whatever needs it. Nothing is persisted.
pub struct CacheStore<K, V> {
  inner: Arc<Inner<K, V>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  // Entries stay consistent even if a holder panicked mid-update
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, V> CacheStore<K, V>
where
  K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
  V: Clone + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Inner {
        entries: Mutex::new(HashMap::new()),
        in_flight: Mutex::new(HashMap::new()),
        next_fetch_id: AtomicU64::new(0),
      }),
    }
  }

  /// Get the entry for `key`, if any. Never fetches.
  pub fn read(&self, key: &K) -> Option<CacheEntry<V>> {
    lock(&self.inner.entries).get(key).cloned()
  }

  /// Return the cached entry if it is younger than `stale_time`, otherwise
  /// fetch, store and return the fresh value.
  ///
  /// Callers that arrive while a fetch for `key` is running join it and get
  /// its outcome instead of starting another one. `fetch_fn` is called with
  /// the cancellation token for the new fetch; it must only build the future
  /// and not touch the store.
  ///
  /// Errors (including cancellation) leave the store as it was.
  pub async fn read_or_fetch<F, Fut>(
    &self,
    key: &K,
    stale_time: Duration,
    fetch_fn: F,
  ) -> Result<CacheEntry<V>, FetchError>
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
  {
    let fetch = {
      let mut in_flight = lock(&self.inner.in_flight);

      if let Some(entry) = self.read(key) {
        if !entry.is_stale(stale_time) {
          trace!(?key, "cache hit");
          return Ok(entry);
        }
      }

      match in_flight.get(key) {
        Some(pending) => {
          debug!(?key, fetch_id = pending.id, "joining in-flight fetch");
          pending.fetch.clone()
        }
        None => {
          let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
          let token = CancellationToken::new();
          debug!(?key, fetch_id = id, "cache miss, fetching");

          let fetch = self.shared_fetch(key.clone(), id, token.clone(), fetch_fn(token.clone()));
          in_flight.insert(
            key.clone(),
            InFlight {
              id,
              token,
              fetch: fetch.clone(),
            },
          );
          fetch
        }
      }
    };

    fetch.await
  }

  fn shared_fetch<Fut>(
    &self,
    key: K,
    id: u64,
    token: CancellationToken,
    fut: Fut,
  ) -> SharedFetch<V>
  where
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
  {
    let inner = Arc::clone(&self.inner);
    async move {
      let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(FetchError::Cancelled),
        result = fut => result,
      };
      inner.settle(&key, id, result)
    }
    .boxed()
    .shared()
  }

  /// Overwrite (or create) the entry for `key`.
  #[cfg(test)]
  pub fn set(&self, key: K, value: V) {
    trace!(?key, "cache set");
    lock(&self.inner.entries).insert(key, CacheEntry::new(value));
  }

  /// Replace the value of every present entry matching `predicate` with
  /// `updater(current)` and bump its `updated_at`.
  ///
  /// Absent keys are never created. Returns the number of entries patched.
  pub fn patch<P, U>(&self, predicate: P, mut updater: U) -> usize
  where
    P: Fn(&K) -> bool,
    U: FnMut(&V) -> V,
  {
    let now = Utc::now();
    let mut entries = lock(&self.inner.entries);
    let mut patched = 0;

    for (key, entry) in entries.iter_mut().filter(|(key, _)| predicate(*key)) {
      entry.value = updater(&entry.value);
      entry.updated_at = now;
      patched += 1;
      trace!(?key, "cache patch");
    }

    patched
  }

  /// Mark every entry matching `predicate` as stale.
  ///
  /// Fetches already running for those keys are detached: their waiters still
  /// get the result, but it is not stored, and the next read starts over.
  pub fn invalidate<P>(&self, predicate: P) -> usize
  where
    P: Fn(&K) -> bool,
  {
    let mut in_flight = lock(&self.inner.in_flight);
    in_flight.retain(|key, pending| {
      let detach = predicate(key);
      if detach {
        debug!(?key, fetch_id = pending.id, "detaching in-flight fetch");
      }
      !detach
    });

    let mut entries = lock(&self.inner.entries);
    let mut invalidated = 0;
    for (key, entry) in entries.iter_mut().filter(|(key, _)| predicate(*key)) {
      entry.invalidated = true;
      invalidated += 1;
      debug!(?key, "cache invalidated");
    }

    invalidated
  }

  /// Cancel in-flight fetches for keys matching `predicate`.
  ///
  /// Waiters receive `FetchError::Cancelled` and nothing is written.
  pub fn cancel<P>(&self, predicate: P) -> usize
  where
    P: Fn(&K) -> bool,
  {
    let mut in_flight = lock(&self.inner.in_flight);
    let mut cancelled = 0;
    in_flight.retain(|key, pending| {
      if !predicate(key) {
        return true;
      }
      debug!(?key, fetch_id = pending.id, "cancelling in-flight fetch");
      pending.token.cancel();
      cancelled += 1;
      false
    });
    cancelled
  }

  /// Drop every entry matching `predicate`.
  pub fn remove<P>(&self, predicate: P) -> usize
  where
    P: Fn(&K) -> bool,
  {
    let mut entries = lock(&self.inner.entries);
    let before = entries.len();
    entries.retain(|key, _| !predicate(key));
    before - entries.len()
  }
}

impl<K, V> Inner<K, V>
where
  K: Clone + Eq + Hash + Debug,
  V: Clone,
{
  /// Publish the outcome of fetch `id`.
  ///
  /// Only the fetch currently registered for `key` may write, and it writes
  /// and unregisters under the same lock.
  fn settle(
    &self,
    key: &K,
    id: u64,
    result: Result<V, FetchError>,
  ) -> Result<CacheEntry<V>, FetchError> {
    let mut in_flight = lock(&self.in_flight);
    let current = in_flight.get(key).is_some_and(|pending| pending.id == id);
    if current {
      in_flight.remove(key);
    }

    match result {
      Ok(value) => {
        let entry = CacheEntry::new(value);
        if current {
          lock(&self.entries).insert(key.clone(), entry.clone());
          debug!(?key, fetch_id = id, "fetch stored");
        } else {
          debug!(?key, fetch_id = id, "discarding result of detached fetch");
        }
        Ok(entry)
      }
      Err(FetchError::Cancelled) => {
        debug!(?key, fetch_id = id, "fetch cancelled");
        Err(FetchError::Cancelled)
      }
      Err(err) => {
        warn!(?key, fetch_id = id, error = %err, "fetch failed");
        Err(err)
      }
    }
  }
}

impl<K, V> Clone for CacheStore<K, V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<K, V> Default for CacheStore<K, V>
where
  K: Clone + Eq + Hash + Debug + Send + Sync + 'static,
  V: Clone + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}
