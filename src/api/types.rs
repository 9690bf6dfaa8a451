//! Serde types matching platform API responses.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a project.
///
/// Statuses this client does not know decode as `Unknown` and the raw string
/// is dropped, so they serialize back as `"UNKNOWN"` (for example in
/// `list --json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
  ActiveHealthy,
  ActiveUnhealthy,
  ComingUp,
  GoingDown,
  Inactive,
  InitFailed,
  Pausing,
  PauseFailed,
  Removed,
  Resizing,
  Restarting,
  Restoring,
  RestoreFailed,
  Upgrading,
  // Anything the server adds later lands here rather than failing the decode
  #[serde(other)]
  Unknown,
}

impl ProjectStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::ActiveHealthy => "ACTIVE_HEALTHY",
      Self::ActiveUnhealthy => "ACTIVE_UNHEALTHY",
      Self::ComingUp => "COMING_UP",
      Self::GoingDown => "GOING_DOWN",
      Self::Inactive => "INACTIVE",
      Self::InitFailed => "INIT_FAILED",
      Self::Pausing => "PAUSING",
      Self::PauseFailed => "PAUSE_FAILED",
      Self::Removed => "REMOVED",
      Self::Resizing => "RESIZING",
      Self::Restarting => "RESTARTING",
      Self::Restoring => "RESTORING",
      Self::RestoreFailed => "RESTORE_FAILED",
      Self::Upgrading => "UPGRADING",
      Self::Unknown => "UNKNOWN",
    }
  }

  /// Whether the project is paused (or on its way there).
  pub fn is_paused(&self) -> bool {
    matches!(self, Self::Inactive | Self::Pausing)
  }
}

impl fmt::Display for ProjectStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Status of the project's REST (PostgREST) service. Only present on detail
/// responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostgrestStatus {
  Online,
  Offline,
}

impl fmt::Display for PostgrestStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Online => f.write_str("ONLINE"),
      Self::Offline => f.write_str("OFFLINE"),
    }
  }
}

/// A project as returned by the list and detail endpoints.
///
/// Only the fields this crate reads are typed. Everything else is carried in
/// `extra` and serialized back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
  #[serde(default)]
  pub id: u64,
  #[serde(rename = "ref")]
  pub project_ref: String,
  #[serde(default)]
  pub name: String,
  pub status: ProjectStatus,
  #[serde(default)]
  pub region: Option<String>,
  #[serde(default)]
  pub organization_id: Option<u64>,
  #[serde(default)]
  pub inserted_at: Option<String>,
  #[serde(
    rename = "postgrestStatus",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub postgrest_status: Option<PostgrestStatus>,
  #[serde(flatten)]
  pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The signed-in user's profile. Its presence is what gates project queries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
  pub id: u64,
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub primary_email: Option<String>,
}

/// Error body shapes the platform uses for non-success responses.
#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
  pub message: Option<String>,
  pub msg: Option<String>,
  pub error: Option<String>,
}

impl ApiErrorBody {
  pub fn into_message(self) -> Option<String> {
    self.message.or(self.msg).or(self.error)
  }
}
