//! Cache keys for project data. Anything that wants to read or patch the same
//! entries as the project queries should build its keys here.

use crate::cache::CacheKey;

pub const LIST_KIND: &str = "all-projects";
pub const DETAIL_KIND: &str = "project";

/// Key of the list of all projects
pub fn list() -> CacheKey {
  CacheKey::new(LIST_KIND)
}

/// Key of a single project by ref
pub fn detail(project_ref: &str) -> CacheKey {
  CacheKey::scoped(DETAIL_KIND, project_ref)
}
