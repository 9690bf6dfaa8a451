//! Project queries on top of the generic cache.
//!
//! Both project key families live in one `CacheStore`: the list of all
//! projects and one detail entry per project ref.

pub mod keys;
mod mutations;
mod prefetch;
mod query;

pub use mutations::ProjectMutations;
pub use prefetch::PrefetchOnce;
pub use query::{ProjectsQuery, PROJECTS_STALE_MINUTES};

use crate::api::ProjectInfo;
use crate::cache::{CacheKey, CacheStore};

/// Value stored under a project cache key.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectData {
  /// Stored under `keys::list()`
  List(Vec<ProjectInfo>),
  /// Stored under `keys::detail(ref)`
  Detail(ProjectInfo),
}

impl ProjectData {
  pub fn as_list(&self) -> Option<&[ProjectInfo]> {
    match self {
      ProjectData::List(projects) => Some(projects),
      ProjectData::Detail(_) => None,
    }
  }

  pub fn as_detail(&self) -> Option<&ProjectInfo> {
    match self {
      ProjectData::Detail(project) => Some(project),
      ProjectData::List(_) => None,
    }
  }
}

/// The store shared by every project query and mutation.
pub type ProjectCache = CacheStore<CacheKey, ProjectData>;
