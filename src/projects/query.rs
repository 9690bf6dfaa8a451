use chrono::Duration;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{keys, PrefetchOnce, ProjectCache, ProjectData};
use crate::api::{FetchError, ProjectInfo, ProjectsApi, RemoteError};
use crate::cache::CacheKey;
use crate::query::Query;

/// How long a fetched project list satisfies reads without refetching.
pub const PROJECTS_STALE_MINUTES: i64 = 30;

/// Read side of the project cache: "cached or fetch" access to the project
/// list and project details.
#[derive(Clone)]
pub struct ProjectsQuery {
  api: Arc<dyn ProjectsApi>,
  cache: ProjectCache,
  stale_time: Duration,
}

impl ProjectsQuery {
  pub fn new(api: Arc<dyn ProjectsApi>, cache: ProjectCache) -> Self {
    Self {
      api,
      cache,
      stale_time: Duration::minutes(PROJECTS_STALE_MINUTES),
    }
  }

  /// Set the stale time for cached project data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn cache(&self) -> &ProjectCache {
    &self.cache
  }

  /// Cached project list, or a fresh one if the cache is stale or empty.
  pub async fn fetch(&self) -> Result<Vec<ProjectInfo>, FetchError> {
    let api = Arc::clone(&self.api);
    let key = keys::list();

    let entry = self
      .cache
      .read_or_fetch(&key, self.stale_time, move |signal| async move {
        api.fetch_list(signal, None).await.map(ProjectData::List)
      })
      .await?;

    match entry.value {
      ProjectData::List(projects) => Ok(projects),
      ProjectData::Detail(_) => Err(shape_mismatch(&key)),
    }
  }

  /// Cached project detail, or a fresh one if the cache is stale or empty.
  ///
  /// A 404 drops whatever detail was cached for the project, so a deleted
  /// project is not served from a stale entry later.
  pub async fn detail(&self, project_ref: &str) -> Result<ProjectInfo, FetchError> {
    let api = Arc::clone(&self.api);
    let key = keys::detail(project_ref);
    let owned_ref = project_ref.to_string();

    let result = self
      .cache
      .read_or_fetch(&key, self.stale_time, move |signal| async move {
        api
          .fetch_detail(&owned_ref, signal)
          .await
          .map(ProjectData::Detail)
      })
      .await;

    let entry = match result {
      Ok(entry) => entry,
      Err(
        err @ FetchError::Remote(RemoteError::Transport {
          status: Some(404), ..
        }),
      ) => {
        let removed = self.cache.remove(|k| *k == key);
        info!(removed, project_ref, "project not found, dropped cached detail");
        return Err(err);
      }
      Err(e) => return Err(e),
    };

    match entry.value {
      ProjectData::Detail(project) => Ok(project),
      ProjectData::List(_) => Err(shape_mismatch(&key)),
    }
  }

  /// Observer for the project list.
  ///
  /// While `enabled` is false (e.g. the profile has not loaded yet) the query
  /// stays `NotStarted` and nothing is fetched; flip it with
  /// `Query::set_enabled`.
  pub fn query(&self, enabled: bool) -> Query<Vec<ProjectInfo>> {
    let this = self.clone();
    let mut query = Query::new(move || {
      let this = this.clone();
      async move { this.fetch().await }
    })
    .enabled(enabled);

    query.fetch();
    query
  }

  /// Observer for one project's detail. Same gating as `query`.
  pub fn detail_query(&self, project_ref: &str, enabled: bool) -> Query<ProjectInfo> {
    let this = self.clone();
    let project_ref = project_ref.to_string();
    let mut query = Query::new(move || {
      let this = this.clone();
      let project_ref = project_ref.clone();
      async move { this.detail(&project_ref).await }
    })
    .enabled(enabled);

    query.fetch();
    query
  }

  /// Warm the cache in the background. Errors are only logged.
  pub fn prefetch(&self) -> JoinHandle<()> {
    let this = self.clone();
    tokio::spawn(async move {
      match this.fetch().await {
        Ok(projects) => debug!(count = projects.len(), "prefetched projects"),
        Err(e) => debug!(error = %e, "project prefetch did not complete"),
      }
    })
  }

  /// Prefetch through `latch`, so a view triggers at most one automatic
  /// prefetch however often it asks.
  pub fn auto_prefetch(&self, latch: &PrefetchOnce) -> Option<JoinHandle<()>> {
    latch.try_fire().then(|| self.prefetch())
  }

  /// Mark the cached project list stale.
  pub fn invalidate_all(&self) {
    let list_key = keys::list();
    let invalidated = self.cache.invalidate(|key| key.matches(&list_key));
    info!(invalidated, "invalidated {}", list_key.description());
  }

  /// Mark one project's cached detail stale.
  pub fn invalidate_detail(&self, project_ref: &str) {
    let detail_key = keys::detail(project_ref);
    let invalidated = self.cache.invalidate(|key| *key == detail_key);
    debug!(invalidated, project_ref, "invalidated project detail");
  }

  /// Cancel any running fetch of the project list.
  pub fn cancel(&self) {
    let list_key = keys::list();
    self.cache.cancel(|key| key.matches(&list_key));
  }
}

fn shape_mismatch(key: &CacheKey) -> FetchError {
  RemoteError::Decode(format!("cached value for {} has an unexpected shape", key)).into()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ProjectStatus;
  use crate::query::QueryState;
  use async_trait::async_trait;
  use reqwest::header::HeaderMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;
  use tokio_util::sync::CancellationToken;

  /// In-memory `ProjectsApi` that counts calls and can be slowed down or
  /// made to fail.
  #[derive(Default)]
  struct StubApi {
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    delay_ms: u64,
    fail: Mutex<Option<RemoteError>>,
  }

  impl StubApi {
    fn slow(delay_ms: u64) -> Self {
      Self {
        delay_ms,
        ..Self::default()
      }
    }

    fn projects() -> Vec<ProjectInfo> {
      serde_json::from_value(serde_json::json!([
        { "ref": "a", "name": "alpha", "status": "ACTIVE_HEALTHY" },
        { "ref": "b", "name": "beta", "status": "ACTIVE_HEALTHY" }
      ]))
      .unwrap()
    }
  }

  #[async_trait]
  impl ProjectsApi for StubApi {
    async fn fetch_list(
      &self,
      signal: CancellationToken,
      _headers: Option<HeaderMap>,
    ) -> Result<Vec<ProjectInfo>, FetchError> {
      self.list_calls.fetch_add(1, Ordering::SeqCst);
      tokio::select! {
        _ = signal.cancelled() => return Err(FetchError::Cancelled),
        _ = tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)) => {}
      }
      if let Some(err) = self.fail.lock().unwrap().clone() {
        return Err(err.into());
      }
      Ok(Self::projects())
    }

    async fn fetch_detail(
      &self,
      project_ref: &str,
      _signal: CancellationToken,
    ) -> Result<ProjectInfo, FetchError> {
      self.detail_calls.fetch_add(1, Ordering::SeqCst);
      Self::projects()
        .into_iter()
        .find(|p| p.project_ref == project_ref)
        .ok_or_else(|| RemoteError::status(404, "Project not found").into())
    }
  }

  fn setup(api: StubApi) -> (Arc<StubApi>, ProjectsQuery) {
    let api = Arc::new(api);
    let query = ProjectsQuery::new(api.clone(), ProjectCache::new());
    (api, query)
  }

  async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
  }

  #[tokio::test]
  async fn test_fetch_caches_list() {
    let (api, projects) = setup(StubApi::default());

    let first = projects.fetch().await.unwrap();
    let second = projects.fetch().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    assert!(projects.cache().read(&keys::list()).is_some());
  }

  #[tokio::test]
  async fn test_concurrent_fetches_are_deduplicated() {
    let (api, projects) = setup(StubApi::slow(30));

    let (a, b, c) = tokio::join!(projects.fetch(), projects.fetch(), projects.fetch());

    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(a.unwrap(), b.clone().unwrap());
    assert_eq!(b.unwrap(), c.unwrap());
  }

  #[tokio::test]
  async fn test_invalidate_all_forces_refetch() {
    let (api, projects) = setup(StubApi::default());

    projects.fetch().await.unwrap();
    projects.invalidate_all();
    projects.fetch().await.unwrap();

    assert_eq!(api.list_calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_error_is_surfaced_and_not_cached() {
    let api = StubApi::default();
    *api.fail.lock().unwrap() = Some(RemoteError::status(500, "Internal Server Error"));
    let (_api, projects) = setup(api);

    let err = projects.fetch().await.unwrap_err();

    assert_eq!(
      err,
      FetchError::Remote(RemoteError::status(500, "Internal Server Error"))
    );
    assert!(projects.cache().read(&keys::list()).is_none());
  }

  #[tokio::test]
  async fn test_cancel_leaves_cache_empty() {
    let (_api, projects) = setup(StubApi::slow(500));

    let pending = {
      let projects = projects.clone();
      tokio::spawn(async move { projects.fetch().await })
    };
    settle().await;
    projects.cancel();

    assert!(pending.await.unwrap().unwrap_err().is_cancelled());
    assert!(projects.cache().read(&keys::list()).is_none());
  }

  #[tokio::test]
  async fn test_disabled_query_stays_not_started() {
    let (api, projects) = setup(StubApi::default());

    let mut query = projects.query(false);
    settle().await;

    assert!(!query.poll());
    assert!(matches!(query.state(), QueryState::NotStarted));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);

    query.set_enabled(true);
    settle().await;
    assert!(query.poll());
    assert_eq!(query.data().map(Vec::len), Some(2));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_query_reports_error_slot() {
    let api = StubApi::default();
    *api.fail.lock().unwrap() = Some(RemoteError::Decode("not a list".to_string()));
    let (_api, projects) = setup(api);

    let mut query = projects.query(true);
    settle().await;

    assert!(query.poll());
    assert!(query.data().is_none());
    assert!(matches!(
      query.error(),
      Some(FetchError::Remote(RemoteError::Decode(_)))
    ));
  }

  #[tokio::test]
  async fn test_auto_prefetch_fires_once() {
    let (api, projects) = setup(StubApi::default());
    let latch = PrefetchOnce::new();

    let first = projects.auto_prefetch(&latch);
    assert!(first.is_some());
    for _ in 0..5 {
      assert!(projects.auto_prefetch(&latch).is_none());
    }
    if let Some(handle) = first {
      handle.await.unwrap();
    }

    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    assert!(projects.cache().read(&keys::list()).is_some());
  }

  #[tokio::test]
  async fn test_prefetched_list_serves_query() {
    let (api, projects) = setup(StubApi::default());

    projects.prefetch().await.unwrap();
    let mut query = projects.query(true);
    settle().await;
    query.poll();

    assert_eq!(query.data().map(Vec::len), Some(2));
    assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_detail_is_cached_separately() {
    let (api, projects) = setup(StubApi::default());

    let detail = projects.detail("b").await.unwrap();
    projects.detail("b").await.unwrap();

    assert_eq!(detail.name, "beta");
    assert_eq!(detail.status, ProjectStatus::ActiveHealthy);
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 1);
    assert!(projects.cache().read(&keys::list()).is_none());

    // Invalidating the list leaves details alone
    projects.invalidate_all();
    assert!(!projects.cache().read(&keys::detail("b")).unwrap().invalidated);
  }

  #[tokio::test]
  async fn test_invalidate_detail_refetches_only_that_project() {
    let (api, projects) = setup(StubApi::default());

    projects.detail("a").await.unwrap();
    projects.detail("b").await.unwrap();
    projects.invalidate_detail("a");
    projects.detail("a").await.unwrap();
    projects.detail("b").await.unwrap();

    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn test_detail_not_found() {
    let (_api, projects) = setup(StubApi::default());

    let err = projects.detail("zzz").await.unwrap_err();
    assert_eq!(
      err,
      FetchError::Remote(RemoteError::status(404, "Project not found"))
    );
  }

  #[tokio::test]
  async fn test_detail_not_found_drops_cached_detail() {
    let (api, projects) = setup(StubApi::default());
    let mut gone = StubApi::projects().remove(0);
    gone.project_ref = "zzz".to_string();
    projects
      .cache()
      .set(keys::detail("zzz"), ProjectData::Detail(gone));
    projects.invalidate_detail("zzz");

    assert!(projects.detail("zzz").await.is_err());
    assert!(projects.cache().read(&keys::detail("zzz")).is_none());
    assert_eq!(api.detail_calls.load(Ordering::SeqCst), 1);

    // Other details are untouched
    projects.detail("a").await.unwrap();
    assert!(projects.cache().read(&keys::detail("a")).is_some());
  }
}
