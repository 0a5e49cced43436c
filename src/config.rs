use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cache::FetchPolicy;
use crate::db::seed::SeedOptions;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
  #[serde(default)]
  pub remote: RemoteConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  #[serde(default)]
  pub seed: SeedConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteConfig {
  /// Base URL of the hiring service, e.g. "http://localhost:4000/api"
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// When false, every operation answers from the local store
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for RemoteConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      enabled: true,
    }
  }
}

fn default_base_url() -> String {
  "http://localhost:4000/api".to_string()
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StorageConfig {
  /// SQLite file (defaults to $XDG_DATA_HOME/hireflow/store.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeedConfig {
  /// Fixed bootstrap seed; a random one is drawn and logged when unset
  pub value: Option<u64>,
  #[serde(default = "default_seed_jobs")]
  pub jobs: usize,
  #[serde(default = "default_seed_candidates")]
  pub candidates: usize,
  #[serde(default = "default_seed_assessments")]
  pub assessments: usize,
}

impl Default for SeedConfig {
  fn default() -> Self {
    let defaults = SeedOptions::default();
    Self {
      value: defaults.seed,
      jobs: defaults.jobs,
      candidates: defaults.candidates,
      assessments: defaults.assessments,
    }
  }
}

fn default_seed_jobs() -> usize {
  SeedOptions::default().jobs
}

fn default_seed_candidates() -> usize {
  SeedOptions::default().candidates
}

fn default_seed_assessments() -> usize {
  SeedOptions::default().assessments
}

impl SeedConfig {
  pub fn options(&self) -> SeedOptions {
    SeedOptions {
      seed: self.value,
      jobs: self.jobs,
      candidates: self.candidates,
      assessments: self.assessments,
    }
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogConfig {
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
  /// Filter directive used when HIREFLOW_LOG is unset (e.g. "info", "hireflow=debug")
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      file: None,
      level: default_log_level(),
    }
  }
}

fn default_log_level() -> String {
  "warn".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./hireflow.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/hireflow/config.yaml
  ///
  /// Without a file every setting takes its default.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("hireflow.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("hireflow").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Get the API token from the environment.
  ///
  /// Checks HIREFLOW_API_TOKEN; the remote service is reached without
  /// credentials when it is unset.
  pub fn get_api_token() -> Option<String> {
    std::env::var("HIREFLOW_API_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }

  /// Fetch policy implied by the remote settings.
  pub fn policy(&self) -> FetchPolicy {
    if self.remote.enabled {
      FetchPolicy::NetworkFirst
    } else {
      FetchPolicy::LocalOnly
    }
  }

  /// Store location: the configured path, else the platform data dir.
  pub fn store_path(&self) -> Result<PathBuf> {
    self
      .storage
      .path
      .clone()
      .or_else(crate::db::LocalStore::default_path)
      .ok_or_else(|| eyre!("Could not determine a data directory; set storage.path"))
  }
}
