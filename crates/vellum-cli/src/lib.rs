//! Concrete collaborators and configuration for the `vellum` binary.
//!
//! The engine only sees the collaborator traits from `vellum-core`; this
//! crate supplies the implementations used in production: exported files on
//! the local filesystem, an HTTP cache-purge client, a notifier that writes
//! to the log, and a principal directory read from configuration.

pub mod blobs;
pub mod directory;
pub mod purge;
pub mod settings;

use vellum_core::collab::Services;
use vellum_engine::Engine;
use vellum_html::{BasicRenderer, RegionNormalizer};
use vellum_store_sqlite::SqliteStore;

pub use blobs::FsBlobStore;
pub use directory::{LogNotifier, StaticDirectory};
pub use purge::HttpPurger;
pub use settings::{AppConfig, PurgeConfig};

/// The collaborator bundle wired up by the binary.
pub type AppServices =
  Services<HttpPurger, BasicRenderer, FsBlobStore, RegionNormalizer, LogNotifier, StaticDirectory>;

pub type AppEngine = Engine<SqliteStore, AppServices>;

/// Build the collaborator bundle described by `config`.
pub fn services(config: &AppConfig) -> anyhow::Result<AppServices> {
  Ok(Services {
    purger:    HttpPurger::new(config.purge.clone())?,
    renderer:  BasicRenderer::new(config.engine.site_name.clone()),
    blobs:     FsBlobStore::new(config.export_dir.clone()),
    sanitizer: RegionNormalizer,
    notifier:  LogNotifier,
    directory: StaticDirectory::new(config.directory.clone()),
  })
}
