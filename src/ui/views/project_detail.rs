use crate::api::ProjectInfo;
use crate::projects::keys;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::status_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{PendingAction, ProjectAction, ProjectServices};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// View for displaying one project's details
pub struct ProjectDetailView {
  project_ref: String,
  services: ProjectServices,
  query: Query<ProjectInfo>,
  pending: Option<PendingAction>,
  message: Option<String>,
}

impl ProjectDetailView {
  pub fn new(project_ref: String, services: ProjectServices, ready: bool) -> Self {
    let query = services.projects.detail_query(&project_ref, ready);

    Self {
      project_ref,
      services,
      query,
      pending: None,
      message: None,
    }
  }

  /// Cached detail if present (it carries optimistic patches), else whatever
  /// the query last delivered.
  fn project(&self) -> Option<ProjectInfo> {
    self
      .services
      .projects
      .cache()
      .read(&keys::detail(&self.project_ref))
      .and_then(|entry| entry.value.as_detail().cloned())
      .or_else(|| self.query.data().cloned())
  }

  fn start_action(&mut self, action: ProjectAction) {
    if self.pending.is_some() {
      return;
    }
    if let Some(project) = self.project() {
      if !action.applies_to(project.status) {
        self.message = Some(format!(
          "cannot {} a project that is {}",
          action.label(),
          project.status
        ));
        return;
      }
    }

    let pending = PendingAction::start(
      &self.services.api,
      &self.services.mutations,
      action,
      &self.project_ref,
    );
    self.message = Some(pending.describe());
    self.pending = Some(pending);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::NotStarted => format!(" {} (waiting for profile...) ", self.project_ref),
      QueryState::Loading => format!(" {} (loading...) ", self.project_ref),
      QueryState::Error(e) => format!(" {} (error: {}) ", self.project_ref, e),
      QueryState::Success(_) => format!(" {} ", self.project_ref),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let project = match self.project() {
      Some(project) => project,
      None => {
        let (content, color) = match self.query.error() {
          Some(error) => (format!("Error: {}\n\nPress 'r' to retry.", error), Color::Red),
          None => ("Loading project details...".to_string(), Color::DarkGray),
        };
        frame.render_widget(
          Paragraph::new(content).style(Style::default().fg(color)),
          inner,
        );
        return;
      }
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(7), // Known fields
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Everything else the API returned
        Constraint::Length(1), // Message
      ])
      .split(inner);

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let postgrest = project
      .postgrest_status
      .map(|s| s.to_string())
      .unwrap_or_else(|| "-".to_string());

    let known = vec![
      Line::from(vec![label("Name:         "), Span::raw(project.name.clone())]),
      Line::from(vec![
        label("Ref:          "),
        Span::styled(project.project_ref.clone(), Style::default().fg(Color::Cyan)),
      ]),
      Line::from(vec![
        label("Status:       "),
        Span::styled(
          project.status.to_string(),
          Style::default().fg(status_color(project.status)),
        ),
      ]),
      Line::from(vec![label("REST service: "), Span::raw(postgrest)]),
      Line::from(vec![
        label("Region:       "),
        Span::raw(project.region.clone().unwrap_or_else(|| "-".to_string())),
      ]),
      Line::from(vec![
        label("Organization: "),
        Span::raw(
          project
            .organization_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string()),
        ),
      ]),
      Line::from(vec![
        label("Created:      "),
        Span::raw(project.inserted_at.clone().unwrap_or_else(|| "-".to_string())),
      ]),
    ];
    frame.render_widget(Paragraph::new(known), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let extra: Vec<Line> = project
      .extra
      .iter()
      .map(|(key, value)| {
        Line::from(vec![
          Span::styled(format!("{}: ", key), Style::default().fg(Color::DarkGray)),
          Span::raw(value.to_string()),
        ])
      })
      .collect();
    frame.render_widget(Paragraph::new(extra).wrap(Wrap { trim: true }), chunks[2]);

    if let Some(message) = &self.message {
      frame.render_widget(
        Paragraph::new(message.as_str()).style(Style::default().fg(Color::Yellow)),
        chunks[3],
      );
    }
  }
}

impl View for ProjectDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.services.projects.invalidate_detail(&self.project_ref);
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('p') => {
        self.start_action(ProjectAction::Pause);
        ViewAction::None
      }
      KeyCode::Char('u') => {
        self.start_action(ProjectAction::Restore);
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.project_ref.clone()
  }

  fn route(&self) -> String {
    format!("/project/{}", self.project_ref)
  }

  fn project_ref(&self) -> Option<&str> {
    Some(&self.project_ref)
  }

  fn on_ready(&mut self) {
    self.query.set_enabled(true);
  }

  fn tick(&mut self) {
    self.query.poll();
    if let Some(pending) = &mut self.pending {
      if let Some(line) = pending.poll() {
        self.message = Some(line);
        self.pending = None;
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh").with_priority(10),
      ShortcutInfo::new("p", "pause").with_priority(20),
      ShortcutInfo::new("u", "restore").with_priority(21),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
