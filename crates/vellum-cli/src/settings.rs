//! Application configuration: `config.toml` layered with `VELLUM_`-prefixed
//! environment variables (`VELLUM_ENGINE__SITE_URL`, ...).

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde::Deserialize;
use vellum_engine::EngineConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// SQLite database file.
  pub store_path: PathBuf,
  /// Root directory for exported HTML and site indexes.
  pub export_dir: PathBuf,
  pub engine:     EngineConfig,
  pub purge:      PurgeConfig,
  /// Principal id to display name.
  pub directory:  HashMap<String, String>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("vellum.db"),
      export_dir: PathBuf::from("export"),
      engine:     EngineConfig::default(),
      purge:      PurgeConfig::default(),
      directory:  HashMap::new(),
    }
  }
}

/// Cache purge endpoint. With no endpoint, purges are only logged.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
  pub endpoint:     Option<String>,
  /// Sent as a bearer token.
  pub api_key:      Option<String>,
  pub timeout_secs: u64,
}

impl Default for PurgeConfig {
  fn default() -> Self {
    Self {
      endpoint:     None,
      api_key:      None,
      timeout_secs: 30,
    }
  }
}

impl AppConfig {
  /// Load from `path` (optional) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("VELLUM")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .with_context(|| format!("failed to read config from {}", path.display()))?;

    let mut config: Self = settings
      .try_deserialize()
      .context("failed to deserialise configuration")?;
    config.store_path = expand_tilde(&config.store_path);
    config.export_dir = expand_tilde(&config.export_dir);
    Ok(config)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
