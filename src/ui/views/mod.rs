mod actions;
mod project_detail;
mod project_list;

pub use actions::{PendingAction, ProjectAction};
pub use project_detail::ProjectDetailView;
pub use project_list::ProjectListView;

use crate::api::ApiClient;
use crate::projects::{ProjectMutations, ProjectsQuery};

/// Handles every project view needs: the read side, the write side and the
/// client for lifecycle actions.
#[derive(Clone)]
pub struct ProjectServices {
  pub api: ApiClient,
  pub projects: ProjectsQuery,
  pub mutations: ProjectMutations,
}
