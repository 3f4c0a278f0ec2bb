//! Engine configuration, deserialised from the `[engine]` table of
//! `config.toml`.

use std::time::Duration;

use serde::Deserialize;

/// Upper bound on the export grace window: one day.
const MAX_EXPORT_GRACE_SECS: u64 = 24 * 60 * 60;

const DEFAULT_CONTENT: &str =
  "<div data-region-id=\"main\"><p>This page is under construction.</p></div>";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Absolute base URL used in the sitemap.
  pub site_url:            String,
  pub site_name:           String,
  /// Render live pages and redirect stubs to the blob store.
  pub static_export:       bool,
  /// Versions scheduled within this many seconds are exported immediately.
  pub export_grace_secs:   u64,
  /// Add `/pub/articles/{n}/` to every purge for the page.
  pub purge_asset_folders: bool,
  /// Body for pages created without a template.
  pub default_content:     String,
  pub sweep_interval_secs: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      site_url:            "http://localhost".to_owned(),
      site_name:           String::new(),
      static_export:       false,
      export_grace_secs:   60,
      purge_asset_folders: false,
      default_content:     DEFAULT_CONTENT.to_owned(),
      sweep_interval_secs: 300,
    }
  }
}

impl EngineConfig {
  pub fn export_grace(&self) -> chrono::Duration {
    let secs = self.export_grace_secs.min(MAX_EXPORT_GRACE_SECS);
    chrono::Duration::seconds(secs as i64)
  }

  pub fn sweep_interval(&self) -> Duration { Duration::from_secs(self.sweep_interval_secs.max(1)) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn export_grace_is_clamped() {
    let config = EngineConfig { export_grace_secs: u64::MAX, ..EngineConfig::default() };
    assert_eq!(config.export_grace(), chrono::Duration::days(1));

    let config = EngineConfig::default();
    assert_eq!(config.export_grace(), chrono::Duration::seconds(60));
  }
}
