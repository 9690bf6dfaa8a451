mod api;
mod app;
mod cache;
mod config;
mod event;
mod logging;
mod projects;
mod query;
mod ui;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

use crate::api::ProjectInfo;
use crate::logging::LogTarget;
use crate::ui::renderfns::should_show_header;

#[derive(Parser, Debug)]
#[command(name = "projq")]
#[command(about = "A cached terminal view of your platform projects")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/projq/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the project list and exit
  List {
    /// Print raw JSON instead of a table
    #[arg(long)]
    json: bool,
  },
  /// Report whether the header bar is shown for a route
  Header {
    /// Route path, e.g. /project/abcd or /organizations
    path: String,

    /// Project ref the route is scoped to
    #[arg(long = "ref")]
    project_ref: Option<String>,

    /// Treat the new-layout preview as enabled
    #[arg(long)]
    new_layout: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  match args.command {
    None => {
      let _guard = logging::init(LogTarget::File)?;
      let config = config::Config::load(args.config.as_deref())?;

      let mut app = app::App::new(config)?;
      app.run().await?;
      info!("exited");
    }
    Some(Command::List { json }) => {
      let _guard = logging::init(LogTarget::Stderr)?;
      let config = config::Config::load(args.config.as_deref())?;
      let services = app::build_services(&config)?;

      // Same gate as the TUI: no project fetch before the profile resolves
      let profile = services.api.fetch_profile().await?;
      info!(username = %profile.username, "profile loaded");

      let projects = services.projects.fetch().await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
      } else {
        print_table(&projects);
      }
    }
    Some(Command::Header {
      path,
      project_ref,
      new_layout,
    }) => {
      println!(
        "{}",
        should_show_header(&path, new_layout, project_ref.as_deref())
      );
    }
  }

  Ok(())
}

fn print_table(projects: &[ProjectInfo]) {
  println!("{:<22} {:<16} {:<16} NAME", "REF", "STATUS", "REGION");
  for project in projects {
    println!(
      "{:<22} {:<16} {:<16} {}",
      project.project_ref,
      project.status.as_str(),
      project.region.as_deref().unwrap_or("-"),
      project.name
    );
  }
}
