//! Soft delete, restore and permanent removal.

use chrono::Utc;
use vellum_core::{
  PageNumber,
  collab::Collaborators,
  page::{Document, StatusCode},
  slug,
  store::PageStore,
};

use crate::{Engine, Error, Result};

/// Give up disambiguating a restored title after this many suffixes.
const MAX_SUFFIX: u32 = 1000;

impl<S, C> Engine<S, C>
where
  S: PageStore,
  C: Collaborators,
{
  /// Move a page to the trash. Its live rows, catalog entry and export are
  /// removed; versions are kept with status `Deleted`.
  pub async fn trash(&self, page: PageNumber) -> Result<()> {
    let _guard = self.locks.lock(page).await;

    let versions = self.list_versions(page).await?;
    if versions.iter().any(Document::is_root) {
      return Err(vellum_core::Error::Forbidden("the home page cannot be trashed".into()).into());
    }
    if versions.iter().any(Document::is_redirect) {
      return Err(vellum_core::Error::Forbidden("redirects cannot be trashed".into()).into());
    }

    for mut v in versions.into_iter().filter(|v| !v.is_deleted()) {
      v.status = StatusCode::Deleted;
      self.store.update_document(v).await.map_err(Error::store)?;
    }

    let removed = self.take_offline(page).await?;
    self
      .store
      .delete_catalog_entry(page)
      .await
      .map_err(Error::store)?;
    tracing::info!(page, "page trashed");

    self
      .purge_paths(page, removed.iter().map(|s| slug::route_path(s)).collect())
      .await;
    self.regenerate_site_indexes().await;
    Ok(())
  }

  /// Bring a trashed page back as an unpublished draft. A title now taken by
  /// another page gets a numeric suffix.
  pub async fn restore(&self, page: PageNumber, author_id: &str) -> Result<Document> {
    let _guard = self.locks.lock(page).await;

    let versions = self.list_versions(page).await?;
    let latest = self.latest_version(page).await?;
    if !latest.is_deleted() {
      return Err(vellum_core::Error::Forbidden(format!("page {page} is not in the trash")).into());
    }

    let (title, new_slug) = self.restorable_title(page, &latest.title).await?;
    if title != latest.title {
      tracing::info!(page, from = %latest.title, to = %title, "restored title disambiguated");
    }

    let now = Utc::now();
    let mut restored = None;
    for mut v in versions {
      v.status = StatusCode::Active;
      v.published = None;
      v.expires = None;
      v.title = title.clone();
      v.slug = new_slug.clone();
      if v.id == latest.id {
        v.author_id = author_id.to_owned();
        v.updated = now;
        restored = Some(v.clone());
      }
      self.store.update_document(v).await.map_err(Error::store)?;
    }

    self.remove_redirects_at(&new_slug).await?;
    self.refresh_catalog(page).await?;
    tracing::info!(page, slug = %new_slug, "page restored");

    restored.ok_or_else(|| vellum_core::Error::PageNotFound(page).into())
  }

  /// First of `title`, `title 2`, `title 3`, ... that passes validation.
  async fn restorable_title(&self, page: PageNumber, title: &str) -> Result<(String, String)> {
    let mut candidate = title.to_owned();
    let mut n = 1;
    loop {
      match self.validate_title(&candidate, Some(page)).await {
        Ok(new_slug) => return Ok((candidate, new_slug)),
        Err(e) if e.is_slug_conflict() && n < MAX_SUFFIX => {
          n += 1;
          candidate = slug::disambiguate(title, n);
        }
        Err(e) => return Err(e),
      }
    }
  }

  /// Permanently delete a trashed page and everything derived from it.
  pub async fn purge_page(&self, page: PageNumber) -> Result<()> {
    let _guard = self.locks.lock(page).await;

    let versions = self.list_versions(page).await?;
    if versions.iter().any(Document::is_root) {
      return Err(vellum_core::Error::Forbidden("the home page cannot be purged".into()).into());
    }
    if !versions.iter().all(Document::is_deleted) {
      return Err(
        vellum_core::Error::Forbidden(format!("page {page} must be trashed before purging")).into(),
      );
    }

    self.remove_page_rows(page).await?;
    tracing::info!(page, versions = versions.len(), "page purged");
    Ok(())
  }
}
