pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header, extract_domain, should_show_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let config = app.config();
  let new_layout = config.features.new_layout;
  let title = config
    .title
    .clone()
    .unwrap_or_else(|| extract_domain(&config.api.url).to_string());
  let breadcrumb = app.view_breadcrumb();
  let status = app.profile_status();

  let Some(view) = app.current_view_mut() else {
    return;
  };

  let show_header = should_show_header(&view.route(), new_layout, view.project_ref());
  let header_height = if show_header { 1 } else { 0 };

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(header_height), // Header
      Constraint::Min(1),                // Main content
      Constraint::Length(1),             // Footer
    ])
    .split(frame.area());

  if show_header {
    let project_ref = view.project_ref().map(str::to_string);
    draw_header(
      frame,
      chunks[0],
      &title,
      project_ref.as_deref(),
      &view.shortcuts(),
    );
  }

  view.render(frame, chunks[1]);

  draw_footer(frame, chunks[2], &breadcrumb, &status);
}

/// Keep a list selection inside `0..len`, selecting the first row when
/// nothing is selected yet.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_selection_starts_at_first_row() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));
  }

  #[test]
  fn test_selection_clamped_when_list_shrinks() {
    let mut state = ListState::default();
    state.select(Some(5));
    ensure_valid_selection(&mut state, 2);
    assert_eq!(state.selected(), Some(1));
  }

  #[test]
  fn test_selection_cleared_for_empty_list() {
    let mut state = ListState::default();
    state.select(Some(0));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
