use crate::api::ProjectInfo;
use crate::projects::keys;
use crate::query::{Query, QueryState};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{PendingAction, ProjectAction, ProjectDetailView, ProjectServices};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// View for displaying the list of projects
pub struct ProjectListView {
  services: ProjectServices,
  query: Query<Vec<ProjectInfo>>,
  /// Rows as last read from the cache, so patched statuses show up
  rows: Vec<ProjectInfo>,
  pending: Option<PendingAction>,
  message: Option<String>,
  list_state: ListState,
}

impl ProjectListView {
  /// `ready` is false until the signed-in profile has loaded.
  pub fn new(services: ProjectServices, ready: bool) -> Self {
    let query = services.projects.query(ready);

    Self {
      services,
      query,
      rows: Vec::new(),
      pending: None,
      message: None,
      list_state: ListState::default(),
    }
  }

  fn refresh_rows(&mut self) {
    let cached = self
      .services
      .projects
      .cache()
      .read(&keys::list())
      .and_then(|entry| entry.value.as_list().map(<[ProjectInfo]>::to_vec));

    if let Some(rows) = cached.or_else(|| self.query.data().cloned()) {
      self.rows = rows;
    }
  }

  fn selected(&self) -> Option<&ProjectInfo> {
    self.list_state.selected().and_then(|idx| self.rows.get(idx))
  }

  fn start_action(&mut self, action: ProjectAction) {
    if self.pending.is_some() {
      return;
    }
    let Some(project) = self.selected() else {
      return;
    };

    if !action.applies_to(project.status) {
      self.message = Some(format!(
        "{}: cannot {} a project that is {}",
        project.project_ref,
        action.label(),
        project.status
      ));
      return;
    }

    let pending = PendingAction::start(
      &self.services.api,
      &self.services.mutations,
      action,
      &project.project_ref,
    );
    self.message = Some(pending.describe());
    self.pending = Some(pending);
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows.len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::NotStarted => " Projects (waiting for profile...) ".to_string(),
      QueryState::Loading => " Projects (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Projects (error: {}) ", e),
      QueryState::Success(_) => format!(" Projects ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let (list_area, message_area) = match &self.message {
      Some(_) => {
        let chunks = Layout::default()
          .direction(Direction::Vertical)
          .constraints([Constraint::Min(1), Constraint::Length(1)])
          .split(area);
        (chunks[0], Some(chunks[1]))
      }
      None => (area, None),
    };

    if let (Some(message), Some(message_area)) = (&self.message, message_area) {
      let paragraph = Paragraph::new(format!(" {}", message)).style(Style::default().fg(Color::Yellow));
      frame.render_widget(paragraph, message_area);
    }

    if self.rows.is_empty() && !self.query.is_loading() {
      let content = if self.query.state().is_not_started() {
        "Waiting for the signed-in profile..."
      } else if self.query.is_error() {
        "Failed to load projects. Press 'r' to retry."
      } else {
        "No projects found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, list_area);
      return;
    }

    let items: Vec<ListItem> = self
      .rows
      .iter()
      .map(|project| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<22}", project.project_ref),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<16}", project.status),
            Style::default().fg(status_color(project.status)),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<16}", project.region.as_deref().unwrap_or("-")),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(" "),
          Span::raw(truncate(&project.name, 48)),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut self.list_state);
  }
}

impl View for ProjectListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('r') => {
        self.services.projects.invalidate_all();
        self.query.refetch();
      }
      KeyCode::Char('p') => self.start_action(ProjectAction::Pause),
      KeyCode::Char('u') => self.start_action(ProjectAction::Restore),
      KeyCode::Enter => {
        if let Some(project) = self.selected() {
          return ViewAction::Push(Box::new(ProjectDetailView::new(
            project.project_ref.clone(),
            self.services.clone(),
            self.query.is_enabled(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Projects".to_string()
  }

  fn route(&self) -> String {
    "/projects".to_string()
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
    self.refresh_rows();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "open").with_priority(5),
      ShortcutInfo::new("r", "refresh").with_priority(10),
      ShortcutInfo::new("p", "pause").with_priority(20),
      ShortcutInfo::new("u", "restore").with_priority(21),
      ShortcutInfo::new("q", "quit").with_priority(30),
    ]
  }
}
