//! `vellum`: command-line front end and sweep daemon for the page engine.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and runs one engine operation, printing the result as JSON. `serve`
//! runs the reconciliation sweep on an interval until interrupted.
//!
//! ```text
//! vellum create --title "About" --author alice
//! vellum save 3f6c… --title "About Us" --content about.html --publish-at 2025-01-01T09:00:00Z
//! vellum serve
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vellum_cli::{AppConfig, AppEngine};
use vellum_core::{
  PageNumber,
  catalog::{Permission, ReservedSlug},
  page::DocumentEdit,
};
use vellum_engine::Engine;
use vellum_store_sqlite::SqliteStore;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vellum", author, version, about = "Vellum page lifecycle engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create a page. The first page in an empty store becomes the home page.
  Create {
    #[arg(long)]
    title:    String,
    #[arg(long, default_value = "cli")]
    author:   String,
    #[arg(long)]
    template: Option<Uuid>,
  },
  /// Save an edit of a version; omitted fields keep their stored value.
  Save {
    id:         Uuid,
    #[arg(long)]
    title:      Option<String>,
    /// File holding the new HTML body.
    #[arg(long, value_name = "FILE")]
    content:    Option<PathBuf>,
    #[arg(long, default_value = "cli")]
    author:     String,
    /// Publish the saved version at this instant.
    #[arg(long)]
    publish_at: Option<DateTime<Utc>>,
  },
  /// Publish a version now or at `--at`.
  Publish {
    id: Uuid,
    #[arg(long)]
    at: Option<DateTime<Utc>>,
  },
  /// Revert every version of a page to draft.
  Unpublish { page: PageNumber },
  /// Copy a version into a new draft.
  NewVersion {
    id:     Uuid,
    #[arg(long, default_value = "cli")]
    author: String,
  },
  /// List the versions of a page.
  Versions { page: PageNumber },
  /// Show one version.
  Show { id: Uuid },
  /// Draft, scheduled or live.
  State { page: PageNumber },
  /// List the catalog.
  Catalog,
  /// Resolve the live page served at a slug.
  Resolve {
    slug: String,
    #[arg(long)]
    at:   Option<DateTime<Utc>>,
  },
  /// Move a page to the trash.
  Trash { page: PageNumber },
  /// Restore a trashed page as a draft.
  Restore {
    page:   PageNumber,
    #[arg(long, default_value = "cli")]
    author: String,
  },
  /// Permanently delete a trashed page.
  Purge { page: PageNumber },
  /// Replace a page's permissions, e.g. `--grant role:editors=edit`.
  Permissions {
    page:   PageNumber,
    #[arg(long = "grant", value_parser = parse_permission)]
    grants: Vec<Permission>,
  },
  /// Manage reserved paths.
  #[command(subcommand)]
  Reserved(ReservedCommand),
  /// Store a page template.
  AddTemplate {
    #[arg(long)]
    title:   String,
    #[arg(long, value_name = "FILE")]
    content: PathBuf,
  },
  /// Run one reconciliation sweep.
  Sweep,
  /// Run the reconciliation sweep periodically until interrupted.
  Serve,
}

#[derive(Subcommand)]
enum ReservedCommand {
  List,
  Add {
    path:     String,
    #[arg(long)]
    notes:    Option<String>,
    /// Mark the path as required by the platform.
    #[arg(long)]
    required: bool,
  },
  Remove { path: String },
}

/// Parse `user:<id>=<permission>` or `role:<id>=<permission>`.
fn parse_permission(s: &str) -> Result<Permission, String> {
  let (principal, permission) = s
    .split_once('=')
    .ok_or_else(|| format!("expected KIND:ID=PERMISSION, got {s:?}"))?;
  let (kind, id) = principal
    .split_once(':')
    .ok_or_else(|| format!("expected user:ID or role:ID, got {principal:?}"))?;
  let is_role = match kind {
    "role" => true,
    "user" => false,
    other => return Err(format!("unknown principal kind {other:?}")),
  };
  if id.is_empty() || permission.is_empty() {
    return Err(format!("empty principal or permission in {s:?}"));
  }
  Ok(Permission {
    principal_id: id.to_owned(),
    is_role,
    permission: permission.to_owned(),
  })
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so stdout stays valid JSON.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = AppConfig::load(&cli.config)?;

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;
  let services = vellum_cli::services(&config)?;
  let engine: AppEngine = Engine::new(Arc::new(store), Arc::new(services), config.engine);

  run(&engine, cli.command).await
}

async fn run(engine: &AppEngine, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Create { title, author, template } => {
      print(&engine.create_document(&title, &author, template).await?)
    }
    Command::Save { id, title, content, author, publish_at } => {
      let stored = engine.get_document(id).await?;
      let mut edit = DocumentEdit::from_document(&stored);
      if let Some(title) = title {
        edit.title = title;
      }
      if let Some(path) = content {
        edit.content = tokio::fs::read_to_string(&path)
          .await
          .with_context(|| format!("reading {}", path.display()))?;
      }
      edit.published = publish_at;
      print(&engine.save_document(edit, &author).await?)
    }
    Command::Publish { id, at } => print(&engine.publish(id, at).await?),
    Command::Unpublish { page } => {
      engine.unpublish(page).await?;
      print(&engine.page_state(page).await?)
    }
    Command::NewVersion { id, author } => print(&engine.new_version(id, &author).await?),
    Command::Versions { page } => print(&engine.list_versions(page).await?),
    Command::Show { id } => print(&engine.get_document(id).await?),
    Command::State { page } => print(&engine.page_state(page).await?),
    Command::Catalog => print(&engine.catalog().await?),
    Command::Resolve { slug, at } => {
      print(&engine.resolve_live(&slug, at.unwrap_or_else(Utc::now)).await?)
    }
    Command::Trash { page } => {
      engine.trash(page).await?;
      tracing::info!(page, "trashed");
      Ok(())
    }
    Command::Restore { page, author } => print(&engine.restore(page, &author).await?),
    Command::Purge { page } => {
      engine.purge_page(page).await?;
      tracing::info!(page, "purged");
      Ok(())
    }
    Command::Permissions { page, grants } => print(&engine.set_permissions(page, grants).await?),
    Command::Reserved(ReservedCommand::List) => print(&engine.reserved_slugs().await?),
    Command::Reserved(ReservedCommand::Add { path, notes, required }) => {
      let reserved = ReservedSlug {
        path,
        cosmos_required: required,
        notes,
      };
      engine.add_reserved_slug(reserved.clone()).await?;
      print(&reserved)
    }
    Command::Reserved(ReservedCommand::Remove { path }) => {
      if !engine.remove_reserved_slug(&path).await? {
        anyhow::bail!("no reserved path {path:?}");
      }
      Ok(())
    }
    Command::AddTemplate { title, content } => {
      let content = tokio::fs::read_to_string(&content)
        .await
        .with_context(|| format!("reading {}", content.display()))?;
      print(&engine.add_template(&title, &content).await?)
    }
    Command::Sweep => print(&engine.check_catalog_entries().await?),
    Command::Serve => serve(engine).await,
  }
}

async fn serve(engine: &AppEngine) -> anyhow::Result<()> {
  let every = engine.config().sweep_interval();
  let mut interval = tokio::time::interval(every);
  interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
  tracing::info!(?every, "sweep daemon started");

  loop {
    tokio::select! {
      _ = interval.tick() => {
        if let Err(e) = engine.check_catalog_entries().await {
          tracing::warn!(error = %e, "sweep failed");
        }
      }
      result = tokio::signal::ctrl_c() => {
        result.context("failed to listen for ctrl-c")?;
        tracing::info!("shutting down");
        return Ok(());
      }
    }
  }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_permission_grants() {
    let role = parse_permission("role:editors=edit").unwrap();
    assert!(role.is_role);
    assert_eq!(role.principal_id, "editors");
    assert_eq!(role.permission, "edit");

    let user = parse_permission("user:alice=view").unwrap();
    assert!(!user.is_role);

    assert!(parse_permission("editors=edit").is_err());
    assert!(parse_permission("group:x=edit").is_err());
    assert!(parse_permission("role:=edit").is_err());
  }

  #[test]
  fn cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
  }
}
