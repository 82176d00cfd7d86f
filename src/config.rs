use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Id of the signed-in user, needed for session history
  pub user_id: Option<i64>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub browse: ListConfig,
  #[serde(default)]
  pub history: ListConfig,
  /// Page size of the admin users, reviews and audit log tables
  #[serde(default)]
  pub admin: ListConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  pub url: String,
  /// Overall per-request timeout; unset means the request may pend indefinitely
  pub request_timeout_secs: Option<u64>,
}

impl ApiConfig {
  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_secs.map(Duration::from_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds a fetched entry is served without a refetch
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
    }
  }
}

impl CacheConfig {
  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(self.stale_secs).unwrap_or(i64::MAX / 1000))
  }
}

fn default_stale_secs() -> u64 {
  300
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListConfig {
  #[serde(default = "default_page_size")]
  pub page_size: u32,
}

impl Default for ListConfig {
  fn default() -> Self {
    Self {
      page_size: default_page_size(),
    }
  }
}

fn default_page_size() -> u32 {
  20
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./checkpointer.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/checkpointer/config.yaml
  /// 4. ~/.config/checkpointer/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/checkpointer/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("checkpointer.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("checkpointer").join("config.yaml");
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

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    let lists = [&config.browse, &config.history, &config.admin];
    if lists.iter().any(|list| list.page_size == 0) {
      return Err(eyre!("page_size must be at least 1"));
    }
    Ok(config)
  }

  /// Get the API bearer token from environment variables.
  ///
  /// Checks CHECKPOINTER_TOKEN first, then CHECKPOINTER_API_TOKEN as fallback.
  /// Without a token requests are sent anonymously.
  pub fn get_api_token() -> Option<String> {
    std::env::var("CHECKPOINTER_TOKEN")
      .or_else(|_| std::env::var("CHECKPOINTER_API_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}
