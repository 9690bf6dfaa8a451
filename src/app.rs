use crate::api::{ApiClient, Profile};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::projects::{PrefetchOnce, ProjectCache, ProjectMutations, ProjectsQuery};
use crate::query::{Query, QueryState};
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{ProjectListView, ProjectServices};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Build the shared project services for a config.
pub fn build_services(config: &Config) -> Result<ProjectServices> {
  let api = ApiClient::new(config)?;
  let cache = ProjectCache::new();
  let projects = ProjectsQuery::new(Arc::new(api.clone()), cache.clone())
    .with_stale_time(config.cache.stale_time()?);

  Ok(ProjectServices {
    api,
    projects,
    mutations: ProjectMutations::new(cache),
  })
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Application configuration
  config: Config,

  services: ProjectServices,

  /// Signed-in profile; project queries wait on it
  profile: Query<Profile>,

  /// Set once the profile has loaded
  ready: bool,

  prefetch: PrefetchOnce,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let services = build_services(&config)?;

    let api = services.api.clone();
    let mut profile = Query::new(move || {
      let api = api.clone();
      async move { api.fetch_profile().await }
    });
    profile.fetch();

    let root = ProjectListView::new(services.clone(), false);

    Ok(Self {
      view_stack: vec![Box::new(root)],
      config,
      services,
      profile,
      ready: false,
      prefetch: PrefetchOnce::new(),
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));
    info!(api = %self.config.api.url, "started");

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    // Nothing left to show the in-flight list fetch to
    self.services.projects.cancel();

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {} // Redrawn on the next loop iteration
    }
  }

  fn tick(&mut self) {
    if self.profile.poll() {
      match self.profile.state() {
        QueryState::Success(profile) => {
          info!(username = %profile.username, "profile loaded");
          self.mark_ready();
        }
        QueryState::Error(e) => warn!(error = %e, "failed to load profile"),
        _ => {}
      }
    }

    for view in &mut self.view_stack {
      view.tick();
    }
  }

  /// Open the readiness gate on every view and warm the project cache once.
  fn mark_ready(&mut self) {
    if self.ready {
      return;
    }
    self.ready = true;
    for view in &mut self.view_stack {
      view.on_ready();
    }
    self.services.projects.auto_prefetch(&self.prefetch);
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // Retry the profile from any view while it is failing
    if key.code == KeyCode::Char('r') && self.profile.is_error() {
      self.profile.refetch();
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };

    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        info!(route = %view.route(), "open view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  // Accessors for UI rendering
  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  /// Short profile line for the footer
  pub fn profile_status(&self) -> String {
    match self.profile.state() {
      QueryState::NotStarted | QueryState::Loading => "signing in...".to_string(),
      QueryState::Success(profile) => match &profile.primary_email {
        Some(email) => format!("{} <{}>", profile.username, email),
        None => profile.username.clone(),
      },
      QueryState::Error(e) => format!("profile unavailable: {}", e),
    }
  }
}
