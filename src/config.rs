use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::projects::PROJECTS_STALE_MINUTES;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API domain if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub features: FeaturesConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the platform API
  #[serde(default = "default_api_url")]
  pub url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_api_url(),
    }
  }
}

fn default_api_url() -> String {
  "https://api.supabase.com".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FeaturesConfig {
  /// Preview of the new layout: always show the header bar
  #[serde(default)]
  pub new_layout: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheConfig {
  /// Minutes before a cached project list is refetched
  #[serde(default = "default_stale_minutes")]
  pub stale_minutes: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_minutes: default_stale_minutes(),
    }
  }
}

fn default_stale_minutes() -> i64 {
  PROJECTS_STALE_MINUTES
}

impl CacheConfig {
  /// Staleness window. Negative values count as zero, values too large for a
  /// duration are an error.
  pub fn stale_time(&self) -> Result<chrono::Duration> {
    chrono::Duration::try_minutes(self.stale_minutes.max(0)).ok_or_else(|| {
      eyre!(
        "cache.stale_minutes is out of range: {}",
        self.stale_minutes
      )
    })
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./projq.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/projq/config.yaml
  ///
  /// A missing explicit path is an error. When nothing is found otherwise the
  /// defaults are used, so the token from the environment is all that is
  /// required.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    Self::load_found(path)
  }

  fn load_found(path: Option<PathBuf>) -> Result<Self> {
    match path {
      Some(p) => Self::load_from_path(&p),
      None => {
        debug!("no config file found, using defaults");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("projq.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("projq").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config
      .cache
      .stale_time()
      .map_err(|e| eyre!("Invalid config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the API access token from environment variables.
  ///
  /// Checks PROJQ_ACCESS_TOKEN first, then SUPABASE_ACCESS_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("PROJQ_ACCESS_TOKEN")
      .or_else(|_| std::env::var("SUPABASE_ACCESS_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Access token not found. Set PROJQ_ACCESS_TOKEN or SUPABASE_ACCESS_TOKEN environment variable."
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
  }

  #[test]
  fn test_load_full_config() {
    let file = write_config(
      r#"
api:
  url: https://api.example.com
title: staging
features:
  new_layout: true
cache:
  stale_minutes: 5
"#,
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.api.url, "https://api.example.com");
    assert_eq!(config.title.as_deref(), Some("staging"));
    assert!(config.features.new_layout);
    assert_eq!(
      config.cache.stale_time().unwrap(),
      chrono::Duration::minutes(5)
    );
  }

  #[test]
  fn test_defaults_for_missing_sections() {
    let file = write_config("title: prod\n");

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.api.url, "https://api.supabase.com");
    assert!(!config.features.new_layout);
    assert_eq!(config.cache.stale_minutes, 30);
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");

    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_invalid_yaml_is_an_error() {
    let file = write_config("features: [unclosed\n");

    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
  }

  #[test]
  fn test_negative_stale_minutes_clamp_to_zero() {
    let cache = CacheConfig { stale_minutes: -3 };
    assert_eq!(cache.stale_time().unwrap(), chrono::Duration::zero());
  }

  #[test]
  fn test_huge_stale_minutes_are_rejected() {
    let cache = CacheConfig {
      stale_minutes: i64::MAX,
    };
    assert!(cache.stale_time().is_err());

    let file = write_config("cache:\n  stale_minutes: 9223372036854775807\n");
    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("stale_minutes is out of range"));
  }

  #[test]
  fn test_no_config_file_falls_back_to_defaults() {
    let config = Config::load_found(None).unwrap();
    assert_eq!(config.api.url, "https://api.supabase.com");
    assert!(config.title.is_none());
    assert!(!config.features.new_layout);
    assert_eq!(
      config.cache.stale_time().unwrap(),
      chrono::Duration::minutes(PROJECTS_STALE_MINUTES)
    );
  }
}
