//! Catalog and live-page projections, and the side effects that follow a
//! change in what is live: cache purge, static export, and the site-wide
//! table of contents, sitemap and robots file.
//!
//! Every step here is idempotent; re-running a projection with the same
//! stored versions converges to the same rows.

use std::collections::BTreeSet;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use vellum_core::{
  PageNumber,
  catalog::{CatalogEntry, LivePage},
  collab::{BlobStore as _, CachePurger as _, Collaborators, Directory as _, SiteRenderer as _},
  page::{Document, StatusCode},
  schedule, slug,
  store::PageStore,
};
use vellum_html::SitemapEntry;

use crate::{Engine, Error, Result};

pub(crate) const TOC_PATH: &str = "toc.json";
pub(crate) const SITEMAP_PATH: &str = "sitemap.xml";
pub(crate) const ROBOTS_PATH: &str = "robots.txt";

/// One entry of `toc.json`.
#[derive(Debug, Serialize)]
struct TocEntry<'a> {
  page_number: PageNumber,
  title:       &'a str,
  slug:        &'a str,
  parent_slug: Option<&'a str>,
  published:   Option<DateTime<Utc>>,
}

impl<S, C> Engine<S, C>
where
  S: PageStore,
  C: Collaborators,
{
  /// Refresh the catalog and live rows for `page`, purging `extra_paths`
  /// along with the page's own paths.
  pub(crate) async fn project(&self, page: PageNumber, extra_paths: Vec<String>) -> Result<()> {
    self.refresh_catalog(page).await?;
    self.materialize(page, extra_paths, false).await?;
    Ok(())
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  /// Rebuild the catalog entry for `page` from its latest version. Deleted or
  /// missing pages lose their entry. Permissions are carried over.
  pub(crate) async fn refresh_catalog(&self, page: PageNumber) -> Result<Option<CatalogEntry>> {
    let versions = self.store.versions(page).await.map_err(Error::store)?;
    let Some(latest) = versions.last().filter(|v| !v.is_deleted()) else {
      if self
        .store
        .delete_catalog_entry(page)
        .await
        .map_err(Error::store)?
      {
        tracing::debug!(page, "catalog entry removed");
      }
      return Ok(None);
    };

    let permissions = self
      .store
      .get_catalog_entry(page)
      .await
      .map_err(Error::store)?
      .map(|entry| entry.permissions)
      .unwrap_or_default();

    let author_name = match self
      .services
      .directory()
      .display_name(&latest.author_id)
      .await
    {
      Ok(name) => name,
      Err(e) => {
        tracing::warn!(page, author = %latest.author_id, error = %e, "author lookup failed");
        None
      }
    };

    let intro = if latest.is_redirect() {
      String::new()
    } else {
      vellum_html::intro(&latest.content).unwrap_or_else(|e| {
        tracing::warn!(page, error = %e, "could not extract intro; leaving it empty");
        String::new()
      })
    };

    let entry = CatalogEntry {
      page_number: page,
      title: latest.title.clone(),
      slug: latest.slug.clone(),
      status: latest.status,
      published: catalog_published(&versions, Utc::now()),
      updated: latest.updated,
      author_id: latest.author_id.clone(),
      author_name,
      permissions,
      intro,
    };
    self
      .store
      .replace_catalog_entry(entry.clone())
      .await
      .map_err(Error::store)?;
    Ok(Some(entry))
  }

  // ── Live pages ────────────────────────────────────────────────────────────

  /// Replace the non-redirect live rows of `page` with one row per version
  /// that is live now or scheduled, then purge, export and regenerate the
  /// site indexes. Returns `false` when the rows were already up to date
  /// and nothing was done; `force` skips that check.
  pub(crate) async fn materialize(
    &self,
    page: PageNumber,
    extra_paths: Vec<String>,
    force: bool,
  ) -> Result<bool> {
    let versions = self.store.versions(page).await.map_err(Error::store)?;
    let Some(latest) = versions.last() else {
      return Ok(false);
    };
    if latest.is_deleted() {
      return Ok(false);
    }
    if latest.is_redirect() {
      return self.materialize_redirect(latest).await;
    }

    let now = Utc::now();
    let mut desired: Vec<LivePage> = versions
      .iter()
      .filter(|v| v.has_window_after(now))
      .map(LivePage::from_document)
      .collect();
    desired.sort_by_key(|row| row.id);

    let mut existing: Vec<LivePage> = self
      .store
      .live_pages(page)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|row| !row.is_redirect())
      .collect();
    existing.sort_by_key(|row| row.id);

    if !force && extra_paths.is_empty() && existing == desired {
      return Ok(false);
    }

    self
      .store
      .delete_live_pages(page, false)
      .await
      .map_err(Error::store)?;
    for row in &desired {
      self
        .store
        .insert_live_page(row.clone())
        .await
        .map_err(Error::store)?;
    }
    tracing::debug!(page, rows = desired.len(), "live pages materialised");

    let old_slugs: BTreeSet<&str> = existing.iter().map(|row| row.slug.as_str()).collect();
    let new_slugs: BTreeSet<&str> = desired.iter().map(|row| row.slug.as_str()).collect();

    let mut paths: BTreeSet<String> = old_slugs
      .union(&new_slugs)
      .map(|s| slug::route_path(s))
      .collect();
    paths.extend(extra_paths);

    if self.config.static_export {
      let exported = schedule::live_at(&versions, now + self.config.export_grace());
      for stale in old_slugs
        .iter()
        .filter(|s| exported.is_none_or(|doc| doc.slug != **s))
      {
        self.delete_stale_export(stale).await;
      }
      if let Some(doc) = exported {
        self.export_page(doc).await;
      }
    }

    self.purge_paths(page, paths.into_iter().collect()).await;
    self.regenerate_site_indexes().await;
    Ok(true)
  }

  /// Redirect stubs have a single permanent live row.
  async fn materialize_redirect(&self, stub: &Document) -> Result<bool> {
    let rows = self
      .store
      .live_pages(stub.page_number)
      .await
      .map_err(Error::store)?;
    let row = LivePage::from_document(stub);
    if rows.len() == 1 && rows[0] == row {
      return Ok(false);
    }
    self
      .store
      .delete_live_pages(stub.page_number, true)
      .await
      .map_err(Error::store)?;
    self
      .store
      .insert_live_page(row)
      .await
      .map_err(Error::store)?;
    Ok(true)
  }

  /// Remove the non-redirect live rows of `page` and their exports.
  /// Returns the slugs that were live.
  pub(crate) async fn take_offline(&self, page: PageNumber) -> Result<Vec<String>> {
    let slugs: BTreeSet<String> = self
      .store
      .live_pages(page)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|row| !row.is_redirect())
      .map(|row| row.slug)
      .collect();
    self
      .store
      .delete_live_pages(page, false)
      .await
      .map_err(Error::store)?;

    if self.config.static_export {
      for s in &slugs {
        self.delete_export(s).await;
      }
    }
    Ok(slugs.into_iter().collect())
  }

  // ── Side effects ──────────────────────────────────────────────────────────

  async fn export_page(&self, doc: &Document) {
    let model = json!({
      "title": doc.title,
      "slug": doc.slug,
      "content": doc.content,
      "published": doc.published.map(|p| p.to_rfc3339()),
    });
    let html = match self.services.renderer().render("page", &model).await {
      Ok(html) => html,
      Err(e) => {
        tracing::warn!(page = doc.page_number, slug = %doc.slug, error = %e, "render failed");
        return;
      }
    };
    let path = slug::export_path(&doc.slug);
    if let Err(e) = self
      .services
      .blobs()
      .write(path.clone(), Bytes::from(html), "text/html".to_owned())
      .await
    {
      tracing::warn!(page = doc.page_number, %path, error = %e, "export failed");
    }
  }

  /// Delete the export at a slug the page no longer serves, unless a
  /// redirect stub has taken it over.
  async fn delete_stale_export(&self, page_slug: &str) {
    match self.store.live_pages_by_slug(page_slug).await {
      Ok(rows) if rows.iter().any(LivePage::is_redirect) => {}
      Ok(_) => self.delete_export(page_slug).await,
      Err(e) => tracing::warn!(slug = page_slug, error = %e, "could not check for redirect"),
    }
  }

  pub(crate) async fn delete_export(&self, page_slug: &str) {
    let path = slug::export_path(page_slug);
    if let Err(e) = self.services.blobs().delete(path.clone()).await {
      tracing::warn!(%path, error = %e, "failed to delete export");
    }
  }

  /// Ask the cache to drop `paths` (plus the page's asset folder when
  /// configured). A failed purge is queued for the sweep to retry.
  pub(crate) async fn purge_paths(&self, page: PageNumber, mut paths: Vec<String>) {
    if self.config.purge_asset_folders {
      paths.push(slug::asset_folder(page));
    }
    if paths.is_empty() {
      return;
    }
    if let Err(reason) = self.send_purge(paths.clone()).await {
      tracing::warn!(page, ?paths, %reason, "cache purge failed; queued for retry");
      if let Err(e) = self.store.enqueue_purge(paths).await {
        tracing::warn!(page, error = %e, "failed to queue purge");
      }
    }
  }

  /// Send one purge request. Errors carry a printable reason.
  pub(crate) async fn send_purge(&self, paths: Vec<String>) -> Result<(), String> {
    match self.services.purger().purge(paths).await {
      Ok(outcome) if outcome.success => {
        tracing::debug!(eta = ?outcome.estimated_flush_secs, "cache purge accepted");
        Ok(())
      }
      Ok(outcome) => Err(outcome.message),
      Err(e) => Err(e.to_string()),
    }
  }

  /// Rewrite `toc.json`, `sitemap.xml` and `robots.txt` from the catalog.
  /// Best-effort: failures are logged.
  pub(crate) async fn regenerate_site_indexes(&self) {
    let catalog = match self.store.list_catalog().await {
      Ok(catalog) => catalog,
      Err(e) => {
        tracing::warn!(error = %e, "could not read catalog for site indexes");
        return;
      }
    };
    let now = Utc::now();
    let listed: Vec<&CatalogEntry> = catalog
      .iter()
      .filter(|entry| entry.status == StatusCode::Active)
      .filter(|entry| entry.published.is_some_and(|p| p <= now))
      .collect();

    let toc: Vec<TocEntry<'_>> = listed
      .iter()
      .map(|entry| TocEntry {
        page_number: entry.page_number,
        title:       &entry.title,
        slug:        &entry.slug,
        parent_slug: slug::parent(&entry.slug),
        published:   entry.published,
      })
      .collect();
    match serde_json::to_vec_pretty(&toc) {
      Ok(bytes) => self.write_index(TOC_PATH, bytes, "application/json").await,
      Err(e) => tracing::warn!(error = %e, "could not serialise table of contents"),
    }

    let entries: Vec<SitemapEntry> = listed
      .iter()
      .map(|entry| SitemapEntry { slug: entry.slug.clone(), lastmod: entry.updated })
      .collect();
    match vellum_html::sitemap(&self.config.site_url, &entries) {
      Ok(xml) => self.write_index(SITEMAP_PATH, xml.into_bytes(), "application/xml").await,
      Err(e) => tracing::warn!(error = %e, "could not build sitemap"),
    }

    let robots = vellum_html::robots(&self.config.site_url);
    self.write_index(ROBOTS_PATH, robots.into_bytes(), "text/plain").await;
  }

  async fn write_index(&self, path: &str, bytes: Vec<u8>, content_type: &str) {
    if let Err(e) = self
      .services
      .blobs()
      .write(path.to_owned(), Bytes::from(bytes), content_type.to_owned())
      .await
    {
      tracing::warn!(path, error = %e, "failed to write site index");
    }
  }
}

/// The date shown in the catalog: the live version's publication date, or
/// the earliest scheduled one when nothing is live yet.
fn catalog_published(versions: &[Document], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
  if let Some(stub) = versions.iter().find(|v| v.is_redirect()) {
    return stub.published;
  }
  schedule::live_at(versions, now)
    .and_then(|doc| doc.published)
    .or_else(|| {
      versions
        .iter()
        .filter_map(|v| v.published)
        .filter(|p| *p > now)
        .min()
    })
}
