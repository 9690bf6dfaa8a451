use crate::api::{ApiClient, FetchError, PostgrestStatus, ProjectStatus};
use crate::projects::ProjectMutations;
use crate::query::{Query, QueryState};

/// Lifecycle actions a view can run against the selected project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
  Pause,
  Restore,
}

impl ProjectAction {
  pub fn label(&self) -> &'static str {
    match self {
      ProjectAction::Pause => "pause",
      ProjectAction::Restore => "restore",
    }
  }

  /// Status the project reports right after the action is accepted
  pub fn resulting_status(&self) -> ProjectStatus {
    match self {
      ProjectAction::Pause => ProjectStatus::Pausing,
      ProjectAction::Restore => ProjectStatus::Restoring,
    }
  }

  /// Whether the action makes sense for a project in `status`
  pub fn applies_to(&self, status: ProjectStatus) -> bool {
    match self {
      ProjectAction::Pause => !status.is_paused(),
      ProjectAction::Restore => status == ProjectStatus::Inactive,
    }
  }
}

/// Run `action` on the server and, once accepted, write the new status into
/// the cached list and detail. A paused project's REST service is marked
/// offline as well.
pub fn run_action(
  api: &ApiClient,
  mutations: &ProjectMutations,
  action: ProjectAction,
  project_ref: &str,
) -> Query<ProjectStatus> {
  let api = api.clone();
  let mutations = mutations.clone();
  let project_ref = project_ref.to_string();

  let mut query = Query::new(move || {
    let api = api.clone();
    let mutations = mutations.clone();
    let project_ref = project_ref.clone();
    async move {
      match action {
        ProjectAction::Pause => api.pause_project(&project_ref).await?,
        ProjectAction::Restore => api.restore_project(&project_ref).await?,
      }
      let status = action.resulting_status();
      mutations.set_status(&project_ref, status);
      if action == ProjectAction::Pause {
        mutations.set_postgrest_status(&project_ref, PostgrestStatus::Offline);
      }
      Ok::<_, FetchError>(status)
    }
  });
  query.fetch();
  query
}

/// An action in flight, polled from a view's tick.
pub struct PendingAction {
  action: ProjectAction,
  project_ref: String,
  query: Query<ProjectStatus>,
}

impl PendingAction {
  pub fn start(
    api: &ApiClient,
    mutations: &ProjectMutations,
    action: ProjectAction,
    project_ref: &str,
  ) -> Self {
    Self {
      action,
      project_ref: project_ref.to_string(),
      query: run_action(api, mutations, action, project_ref),
    }
  }

  /// Line to show while the action runs
  pub fn describe(&self) -> String {
    format!("{}: {} requested...", self.project_ref, self.action.label())
  }

  /// Poll the action. Returns a status line once it has finished.
  pub fn poll(&mut self) -> Option<String> {
    if !self.query.poll() {
      return None;
    }
    let line = match self.query.state() {
      QueryState::Success(status) => format!("{}: {}", self.project_ref, status),
      QueryState::Error(e) => format!("{}: {} failed: {}", self.project_ref, self.action.label(), e),
      _ => format!("{}: {} did not complete", self.project_ref, self.action.label()),
    };
    Some(line)
  }
}
