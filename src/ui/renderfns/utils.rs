use ratatui::prelude::Color;

use crate::api::ProjectStatus;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Get the display color for a project status
pub fn status_color(status: ProjectStatus) -> Color {
  match status {
    ProjectStatus::ActiveHealthy => Color::Green,
    ProjectStatus::ComingUp
    | ProjectStatus::Restoring
    | ProjectStatus::Restarting
    | ProjectStatus::Resizing
    | ProjectStatus::Upgrading => Color::Yellow,
    ProjectStatus::ActiveUnhealthy
    | ProjectStatus::InitFailed
    | ProjectStatus::PauseFailed
    | ProjectStatus::RestoreFailed => Color::Red,
    ProjectStatus::Inactive | ProjectStatus::Pausing | ProjectStatus::GoingDown => Color::DarkGray,
    ProjectStatus::Removed | ProjectStatus::Unknown => Color::White,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("ünïcödé name", 7), "ünïc...");
  }

  #[test]
  fn test_status_color_healthy() {
    assert_eq!(status_color(ProjectStatus::ActiveHealthy), Color::Green);
  }

  #[test]
  fn test_status_color_transitional() {
    assert_eq!(status_color(ProjectStatus::ComingUp), Color::Yellow);
    assert_eq!(status_color(ProjectStatus::Restoring), Color::Yellow);
  }

  #[test]
  fn test_status_color_failed_and_paused() {
    assert_eq!(status_color(ProjectStatus::RestoreFailed), Color::Red);
    assert_eq!(status_color(ProjectStatus::Inactive), Color::DarkGray);
    assert_eq!(status_color(ProjectStatus::Unknown), Color::White);
  }
}
