use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::ShortcutInfo;

/// Whether the header bar should be drawn for a view.
///
/// Shown on onboarding (`/new...`), organization and sign-in routes, on any
/// view scoped to a project, and everywhere when the new-layout preview is on.
pub fn should_show_header(pathname: &str, new_layout: bool, project_ref: Option<&str>) -> bool {
  pathname.starts_with("/new")
    || pathname == "/organizations"
    || pathname == "/sign-in"
    || new_layout
    || project_ref.is_some_and(|r| !r.is_empty())
}

/// Draw the header bar with logo, context, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  project_ref: Option<&str>,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(" projq ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
  ];

  if let Some(project_ref) = project_ref {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", project_ref),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }

  spans.push(Span::raw("  "));

  // Shortcuts - keys and brackets highlighted, descriptions dimmed
  let mut shortcuts = shortcuts.to_vec();
  shortcuts.sort_by_key(|s| s.priority);
  for shortcut in shortcuts {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}   ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Extract domain from the API URL
pub fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_header_on_new_routes() {
    assert!(should_show_header("/new/foo", false, None));
    assert!(should_show_header("/new", false, None));
  }

  #[test]
  fn test_header_on_exact_routes() {
    assert!(should_show_header("/sign-in", false, None));
    assert!(should_show_header("/organizations", false, None));
    assert!(!should_show_header("/organizations/acme", false, None));
  }

  #[test]
  fn test_header_hidden_elsewhere() {
    assert!(!should_show_header("/dashboard", false, None));
    assert!(!should_show_header("/projects", false, None));
    assert!(!should_show_header("", false, None));
  }

  #[test]
  fn test_header_with_project_ref() {
    assert!(should_show_header("/dashboard", false, Some("projectref")));
    assert!(!should_show_header("/dashboard", false, Some("")));
  }

  #[test]
  fn test_header_with_new_layout_flag() {
    assert!(should_show_header("/dashboard", true, None));
  }

  #[test]
  fn test_extract_domain() {
    assert_eq!(
      extract_domain("https://api.supabase.com"),
      "api.supabase.com"
    );
    assert_eq!(
      extract_domain("https://api.example.com/v1"),
      "api.example.com"
    );
    assert_eq!(extract_domain("http://localhost:8080"), "localhost:8080");
  }
}
