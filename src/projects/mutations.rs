//! Write-through of known project changes into cached query results.
//!
//! When the app learns that a project changed (for example after pausing
//! it), these helpers patch the cached list and detail entries in place
//! instead of refetching. Only the updated field is touched; the list element
//! and the detail entry are not reconciled otherwise.

use tracing::info;

use super::{keys, ProjectCache, ProjectData};
use crate::api::{PostgrestStatus, ProjectInfo, ProjectStatus};

/// A single-field change to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectUpdate {
  Status(ProjectStatus),
  PostgrestStatus(PostgrestStatus),
}

impl ProjectUpdate {
  /// Copy of `project` with this update's field replaced.
  pub fn apply(&self, project: &ProjectInfo) -> ProjectInfo {
    let mut updated = project.clone();
    match *self {
      ProjectUpdate::Status(status) => updated.status = status,
      ProjectUpdate::PostgrestStatus(status) => updated.postgrest_status = Some(status),
    }
    updated
  }

  /// Copy of `projects` with the update applied to the element matching
  /// `project_ref`.
  pub fn apply_to_list(&self, projects: &[ProjectInfo], project_ref: &str) -> Vec<ProjectInfo> {
    projects
      .iter()
      .map(|project| {
        if project.project_ref == project_ref {
          self.apply(project)
        } else {
          project.clone()
        }
      })
      .collect()
  }
}

/// Applies project updates to the shared cache.
#[derive(Clone)]
pub struct ProjectMutations {
  cache: ProjectCache,
}

impl ProjectMutations {
  pub fn new(cache: ProjectCache) -> Self {
    Self { cache }
  }

  /// Set a project's status in the cached list and in its cached detail.
  pub fn set_status(&self, project_ref: &str, status: ProjectStatus) {
    let update = ProjectUpdate::Status(status);
    let list_key = keys::list();

    let patched_lists = self.cache.patch(
      |key| key.matches(&list_key),
      |data| match data {
        ProjectData::List(projects) => ProjectData::List(update.apply_to_list(projects, project_ref)),
        other => other.clone(),
      },
    );
    let patched_details = self.patch_detail(project_ref, update);

    info!(
      project_ref,
      %status,
      patched_lists,
      patched_details,
      "set cached project status"
    );
  }

  /// Set a project's PostgREST status in its cached detail only.
  pub fn set_postgrest_status(&self, project_ref: &str, status: PostgrestStatus) {
    let patched = self.patch_detail(project_ref, ProjectUpdate::PostgrestStatus(status));
    info!(project_ref, %status, patched, "set cached postgrest status");
  }

  fn patch_detail(&self, project_ref: &str, update: ProjectUpdate) -> usize {
    let detail_key = keys::detail(project_ref);
    self.cache.patch(
      |key| key.matches(&detail_key),
      |data| match data {
        ProjectData::Detail(project) => ProjectData::Detail(update.apply(project)),
        other => other.clone(),
      },
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn project(project_ref: &str, status: ProjectStatus) -> ProjectInfo {
    serde_json::from_value(serde_json::json!({
      "id": 1,
      "ref": project_ref,
      "name": format!("project {}", project_ref),
      "status": status,
      "region": "eu-west-1",
    }))
    .unwrap()
  }

  fn cached_list(cache: &ProjectCache) -> Vec<ProjectInfo> {
    cache
      .read(&keys::list())
      .and_then(|entry| entry.value.as_list().map(<[ProjectInfo]>::to_vec))
      .unwrap()
  }

  fn cached_detail(cache: &ProjectCache, project_ref: &str) -> ProjectInfo {
    cache
      .read(&keys::detail(project_ref))
      .and_then(|entry| entry.value.as_detail().cloned())
      .unwrap()
  }

  #[test]
  fn test_set_status_patches_list_element_and_detail() {
    let cache = ProjectCache::new();
    cache.set(
      keys::list(),
      ProjectData::List(vec![
        project("a", ProjectStatus::ActiveHealthy),
        project("b", ProjectStatus::ActiveHealthy),
      ]),
    );
    let mut detail = project("b", ProjectStatus::ActiveHealthy);
    detail.name = "detail name".to_string();
    detail.postgrest_status = Some(PostgrestStatus::Online);
    cache.set(keys::detail("b"), ProjectData::Detail(detail));

    ProjectMutations::new(cache.clone()).set_status("b", ProjectStatus::Inactive);

    let list = cached_list(&cache);
    assert_eq!(list[0], project("a", ProjectStatus::ActiveHealthy));
    assert_eq!(list[1], project("b", ProjectStatus::Inactive));

    let detail = cached_detail(&cache, "b");
    assert_eq!(detail.status, ProjectStatus::Inactive);
    assert_eq!(detail.name, "detail name");
    assert_eq!(detail.postgrest_status, Some(PostgrestStatus::Online));
  }

  #[test]
  fn test_set_status_bumps_updated_at() {
    let cache = ProjectCache::new();
    cache.set(
      keys::list(),
      ProjectData::List(vec![project("a", ProjectStatus::ActiveHealthy)]),
    );
    cache.set(
      keys::detail("a"),
      ProjectData::Detail(project("a", ProjectStatus::ActiveHealthy)),
    );
    let list_before = cache.read(&keys::list()).unwrap().updated_at;
    let detail_before = cache.read(&keys::detail("a")).unwrap().updated_at;
    std::thread::sleep(std::time::Duration::from_millis(5));

    ProjectMutations::new(cache.clone()).set_status("a", ProjectStatus::Pausing);

    assert!(cache.read(&keys::list()).unwrap().updated_at > list_before);
    assert!(cache.read(&keys::detail("a")).unwrap().updated_at > detail_before);
  }

  #[test]
  fn test_set_postgrest_status_bumps_detail_updated_at() {
    let cache = ProjectCache::new();
    cache.set(
      keys::list(),
      ProjectData::List(vec![project("a", ProjectStatus::ActiveHealthy)]),
    );
    cache.set(
      keys::detail("a"),
      ProjectData::Detail(project("a", ProjectStatus::ActiveHealthy)),
    );
    let list_before = cache.read(&keys::list()).unwrap().updated_at;
    let detail_before = cache.read(&keys::detail("a")).unwrap().updated_at;
    std::thread::sleep(std::time::Duration::from_millis(5));

    ProjectMutations::new(cache.clone()).set_postgrest_status("a", PostgrestStatus::Offline);

    assert!(cache.read(&keys::detail("a")).unwrap().updated_at > detail_before);
    assert_eq!(cache.read(&keys::list()).unwrap().updated_at, list_before);
  }

  #[test]
  fn test_set_status_on_absent_ref_creates_nothing() {
    let cache = ProjectCache::new();
    ProjectMutations::new(cache.clone()).set_status("ghost", ProjectStatus::Inactive);

    assert!(cache.read(&keys::list()).is_none());
    assert!(cache.read(&keys::detail("ghost")).is_none());
  }

  #[test]
  fn test_set_status_with_only_list_cached() {
    let cache = ProjectCache::new();
    cache.set(
      keys::list(),
      ProjectData::List(vec![project("a", ProjectStatus::ActiveHealthy)]),
    );

    ProjectMutations::new(cache.clone()).set_status("a", ProjectStatus::Restoring);

    assert_eq!(cached_list(&cache)[0].status, ProjectStatus::Restoring);
    assert!(cache.read(&keys::detail("a")).is_none());
  }

  #[test]
  fn test_set_postgrest_status_touches_detail_only() {
    let cache = ProjectCache::new();
    let list = vec![project("a", ProjectStatus::ActiveHealthy)];
    cache.set(keys::list(), ProjectData::List(list.clone()));
    cache.set(
      keys::detail("a"),
      ProjectData::Detail(project("a", ProjectStatus::ComingUp)),
    );

    ProjectMutations::new(cache.clone()).set_postgrest_status("a", PostgrestStatus::Offline);

    assert_eq!(cached_list(&cache), list);
    let detail = cached_detail(&cache, "a");
    assert_eq!(detail.postgrest_status, Some(PostgrestStatus::Offline));
    // Diverging fields are left alone
    assert_eq!(detail.status, ProjectStatus::ComingUp);
  }

  #[test]
  fn test_update_keeps_opaque_fields() {
    let mut original = project("a", ProjectStatus::ActiveHealthy);
    original
      .extra
      .insert("cloud_provider".to_string(), serde_json::json!("AWS"));

    let updated = ProjectUpdate::Status(ProjectStatus::GoingDown).apply(&original);

    assert_eq!(updated.status, ProjectStatus::GoingDown);
    assert_eq!(updated.extra, original.extra);
  }
}
