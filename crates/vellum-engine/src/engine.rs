//! [`Engine`]: shared state, read operations and small helpers used by the
//! lifecycle modules.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vellum_core::{
  PageNumber,
  catalog::{CatalogEntry, LivePage, Permission, ReservedSlug},
  collab::{Collaborators, Sanitizer as _},
  page::{Document, Template},
  schedule::{self, PageState},
  store::PageStore,
};

use crate::{EngineConfig, Error, Result, locks::PageLocks};

/// The page lifecycle engine.
///
/// Cloning is cheap; clones share the store, collaborators and page locks.
pub struct Engine<S, C> {
  pub(crate) store:      Arc<S>,
  pub(crate) services:   Arc<C>,
  pub(crate) config:     Arc<EngineConfig>,
  pub(crate) locks:      Arc<PageLocks>,
  pub(crate) last_sweep: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl<S, C> Clone for Engine<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      services:   self.services.clone(),
      config:     self.config.clone(),
      locks:      self.locks.clone(),
      last_sweep: self.last_sweep.clone(),
    }
  }
}

impl<S, C> Engine<S, C>
where
  S: PageStore,
  C: Collaborators,
{
  pub fn new(store: Arc<S>, services: Arc<C>, config: EngineConfig) -> Self {
    Self {
      store,
      services,
      config: Arc::new(config),
      locks: Arc::new(PageLocks::default()),
      last_sweep: Arc::new(Mutex::new(None)),
    }
  }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn store(&self) -> &S { &self.store }

  // ── Reads ─────────────────────────────────────────────────────────────────

  pub async fn get_document(&self, id: Uuid) -> Result<Document> {
    self
      .store
      .get_document(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| vellum_core::Error::DocumentNotFound(id).into())
  }

  /// Every version of a page, oldest first.
  pub async fn list_versions(&self, page: PageNumber) -> Result<Vec<Document>> {
    let versions = self.store.versions(page).await.map_err(Error::store)?;
    if versions.is_empty() {
      return Err(vellum_core::Error::PageNotFound(page).into());
    }
    Ok(versions)
  }

  pub async fn page_state(&self, page: PageNumber) -> Result<PageState> {
    let versions = self.list_versions(page).await?;
    Ok(schedule::page_state(&versions, Utc::now()))
  }

  pub async fn catalog(&self) -> Result<Vec<CatalogEntry>> {
    self.store.list_catalog().await.map_err(Error::store)
  }

  pub async fn catalog_entry(&self, page: PageNumber) -> Result<Option<CatalogEntry>> {
    self.store.get_catalog_entry(page).await.map_err(Error::store)
  }

  /// The live row served for `slug` at `at`. A page row wins over a redirect
  /// stub for the same slug.
  pub async fn resolve_live(&self, slug: &str, at: DateTime<Utc>) -> Result<Option<LivePage>> {
    let rows = self
      .store
      .live_pages_by_slug(slug)
      .await
      .map_err(Error::store)?;
    Ok(
      rows
        .into_iter()
        .filter(|row| row.is_visible_at(at))
        .min_by_key(|row| (row.is_redirect(), std::cmp::Reverse(row.published))),
    )
  }

  // ── Reserved paths, templates, permissions ────────────────────────────────

  pub async fn reserved_slugs(&self) -> Result<Vec<ReservedSlug>> {
    self.store.reserved_slugs().await.map_err(Error::store)
  }

  pub async fn add_reserved_slug(&self, reserved: ReservedSlug) -> Result<()> {
    self.store.add_reserved_slug(reserved).await.map_err(Error::store)
  }

  /// Remove a reserved path. Platform-required paths cannot be removed.
  pub async fn remove_reserved_slug(&self, path: &str) -> Result<bool> {
    let reserved = self.reserved_slugs().await?;
    if reserved.iter().any(|r| r.path == path && r.cosmos_required) {
      return Err(vellum_core::Error::Forbidden(format!("{path:?} is required")).into());
    }
    self.store.remove_reserved_slug(path).await.map_err(Error::store)
  }

  pub async fn add_template(&self, title: &str, content: &str) -> Result<Template> {
    let template = Template {
      id:      Uuid::new_v4(),
      title:   title.trim().to_owned(),
      content: self.sanitize(content),
    };
    self
      .store
      .add_template(template.clone())
      .await
      .map_err(Error::store)?;
    Ok(template)
  }

  /// Replace the permission list on a page's catalog entry.
  pub async fn set_permissions(
    &self,
    page: PageNumber,
    permissions: Vec<Permission>,
  ) -> Result<CatalogEntry> {
    let _guard = self.locks.lock(page).await;

    let mut entry = match self.store.get_catalog_entry(page).await.map_err(Error::store)? {
      Some(entry) => entry,
      None => self
        .refresh_catalog(page)
        .await?
        .ok_or(vellum_core::Error::PageNotFound(page))?,
    };
    entry.permissions = permissions;
    self
      .store
      .replace_catalog_entry(entry.clone())
      .await
      .map_err(Error::store)?;
    Ok(entry)
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// Run content through the sanitizer; on failure keep the input as-is.
  pub(crate) fn sanitize(&self, html: &str) -> String {
    match self.services.sanitizer().normalize(html) {
      Ok(clean) => clean,
      Err(e) => {
        tracing::warn!(error = %e, "content normalisation failed; storing as submitted");
        html.to_owned()
      }
    }
  }
}
