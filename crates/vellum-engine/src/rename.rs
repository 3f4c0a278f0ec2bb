//! Title validation and the rename cascade.
//!
//! A page's slug is derived from its title. Renaming a page moves every
//! page below it in the path hierarchy, drops redirect stubs the new slug
//! would clash with, and leaves a permanent redirect at the old slug when the
//! page had been published.

use std::collections::BTreeSet;

use bytes::Bytes;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use vellum_core::{
  PageNumber,
  catalog::LivePage,
  collab::{BlobStore as _, Collaborators, SiteRenderer as _},
  page::{Document, ROOT_SLUG, StatusCode},
  slug,
  store::PageStore,
};

use crate::{Engine, Error, Result};

/// Title given to redirect stubs; descendants with this title are never
/// rewritten by a cascade.
pub(crate) const REDIRECT_TITLE: &str = "redirect";

impl<S, C> Engine<S, C>
where
  S: PageStore,
  C: Collaborators,
{
  /// Check `title` for use by page `exclude` (or a new page) and return the
  /// slug it maps to.
  pub(crate) async fn validate_title(
    &self,
    title: &str,
    exclude: Option<PageNumber>,
  ) -> Result<String> {
    let title = title.trim();
    let candidate = slug::normalize(title);
    if candidate.is_empty() {
      return Err(vellum_core::Error::InvalidTitle(title.to_owned()).into());
    }

    let reserved = self.store.reserved_slugs().await.map_err(Error::store)?;
    if let Some(hit) = reserved.iter().find(|r| r.blocks(&candidate)) {
      return Err(
        vellum_core::Error::SlugConflict(format!("{candidate:?} is reserved by {:?}", hit.path))
          .into(),
      );
    }
    if self
      .store
      .title_in_use(title, exclude)
      .await
      .map_err(Error::store)?
    {
      return Err(vellum_core::Error::SlugConflict(format!("title {title:?} is taken")).into());
    }
    if self
      .store
      .slug_in_use(&candidate, exclude)
      .await
      .map_err(Error::store)?
    {
      return Err(vellum_core::Error::SlugConflict(format!("{candidate:?} is taken")).into());
    }

    Ok(candidate)
  }

  /// Check a new title for the home page. Its slug never changes, so only
  /// the title itself must be free.
  pub(crate) async fn validate_root_title(&self, title: &str, page: PageNumber) -> Result<String> {
    let title = title.trim();
    if slug::normalize(title).is_empty() {
      return Err(vellum_core::Error::InvalidTitle(title.to_owned()).into());
    }
    if self
      .store
      .title_in_use(title, Some(page))
      .await
      .map_err(Error::store)?
    {
      return Err(vellum_core::Error::SlugConflict(format!("title {title:?} is taken")).into());
    }
    Ok(ROOT_SLUG.to_owned())
  }

  /// Reject a rename whose cascade would move a descendant onto a title or
  /// slug held by a page outside the moving subtree. Nothing is written.
  pub(crate) async fn check_cascade(
    &self,
    old_slug: &str,
    new_title: &str,
    new_slug: &str,
  ) -> Result<()> {
    if old_slug == new_slug || old_slug == ROOT_SLUG {
      return Ok(());
    }
    let descendants = self.store.descendants(old_slug).await.map_err(Error::store)?;

    for doc in &descendants {
      if doc.title.eq_ignore_ascii_case(REDIRECT_TITLE) {
        continue;
      }
      let Some(rebased) = slug::rebase(&doc.slug, old_slug, new_slug) else {
        continue;
      };
      if self
        .store
        .slug_in_use(&rebased, Some(doc.page_number))
        .await
        .map_err(Error::store)?
      {
        return Err(
          vellum_core::Error::SlugConflict(format!(
            "moving {:?} would take {rebased:?}, which is in use",
            doc.slug
          ))
          .into(),
        );
      }
      if let Some(title) = slug::rebase_title(&doc.title, old_slug, new_title)
        && self
          .store
          .title_in_use(&title, Some(doc.page_number))
          .await
          .map_err(Error::store)?
      {
        return Err(
          vellum_core::Error::SlugConflict(format!("title {title:?} is taken")).into(),
        );
      }
    }
    Ok(())
  }

  /// Apply a validated rename of `page` from `old_slug` to `new_title` /
  /// `new_slug`. Returns the extra paths that must be purged along with the
  /// page's own live rows.
  ///
  /// The caller holds the page lock. Descendant pages are updated one by one;
  /// a failure on one is logged and does not stop the others.
  pub(crate) async fn rename_cascade(
    &self,
    page: PageNumber,
    old_slug: &str,
    new_title: &str,
    new_slug: &str,
    was_published: bool,
  ) -> Result<Vec<String>> {
    if old_slug == ROOT_SLUG {
      self.apply_title_since_publish(page, new_title, ROOT_SLUG).await?;
      tracing::info!(page, title = new_title, "home page retitled");
      return Ok(Vec::new());
    }

    let moved = old_slug != new_slug;
    let mut extra = BTreeSet::new();

    for (child, old_child_slug) in self.cascade_descendants(old_slug, new_title, new_slug).await? {
      extra.insert(slug::route_path(&old_child_slug));
      if let Err(e) = self.project(child, vec![slug::route_path(&old_child_slug)]).await {
        tracing::warn!(page = child, error = %e, "failed to re-project renamed descendant");
      }
    }

    if moved {
      self.remove_redirects_at(new_slug).await?;
      for stale in self
        .store
        .redirects_involving(new_slug)
        .await
        .map_err(Error::store)?
        .into_iter()
        .filter(|r| r.content == new_slug)
      {
        self.remove_redirect_stub(&stale).await?;
      }

      if was_published {
        self.create_redirect(old_slug, new_slug).await?;
      }
      extra.insert(slug::route_path(old_slug));
    }

    self.apply_title_since_publish(page, new_title, new_slug).await?;
    tracing::info!(page, from = old_slug, to = new_slug, "page renamed");

    Ok(extra.into_iter().collect())
  }

  /// Move every descendant of `old_slug` below `new_slug`. Returns the
  /// affected page numbers with the slug each had before the move.
  async fn cascade_descendants(
    &self,
    old_slug: &str,
    new_title: &str,
    new_slug: &str,
  ) -> Result<Vec<(PageNumber, String)>> {
    let descendants = self.store.descendants(old_slug).await.map_err(Error::store)?;
    let mut affected: Vec<(PageNumber, String)> = Vec::new();

    for mut doc in descendants {
      if doc.title.eq_ignore_ascii_case(REDIRECT_TITLE) {
        continue;
      }
      let Some(rebased) = slug::rebase(&doc.slug, old_slug, new_slug) else {
        continue;
      };
      let previous = std::mem::replace(&mut doc.slug, rebased);
      if let Some(title) = slug::rebase_title(&doc.title, old_slug, new_title) {
        doc.title = title;
      }
      let page = doc.page_number;

      tracing::debug!(page, from = %previous, to = %doc.slug, "moving descendant");
      match self.store.update_document(doc).await {
        Ok(()) => {
          if !affected.iter().any(|(p, _)| *p == page) {
            affected.push((page, previous));
          }
        }
        Err(e) => {
          tracing::warn!(page, slug = %previous, error = %e, "failed to move descendant");
        }
      }
    }

    Ok(affected)
  }

  /// Set title and slug on every version from the latest published one
  /// onwards, or on all versions if the page was never published.
  async fn apply_title_since_publish(
    &self,
    page: PageNumber,
    title: &str,
    new_slug: &str,
  ) -> Result<()> {
    let versions = self.list_versions(page).await?;
    let since = versions
      .iter()
      .filter(|v| v.published.is_some())
      .map(|v| v.version_number)
      .max()
      .unwrap_or(0);

    for mut version in versions.into_iter().filter(|v| v.version_number >= since) {
      if version.title == title && version.slug == new_slug {
        continue;
      }
      version.title = title.to_owned();
      version.slug = new_slug.to_owned();
      self
        .store
        .update_document(version)
        .await
        .map_err(Error::store)?;
    }
    Ok(())
  }

  /// Insert a permanent redirect stub from `from` to `to` and, with static
  /// export enabled, write a redirect page at the old path.
  async fn create_redirect(&self, from: &str, to: &str) -> Result<Document> {
    let page = self.store.next_page_number().await.map_err(Error::store)?;
    let now = Utc::now();
    let stub = Document {
      id:             Uuid::new_v4(),
      page_number:    page,
      version_number: 1,
      title:          REDIRECT_TITLE.to_owned(),
      slug:           from.to_owned(),
      content:        to.to_owned(),
      status:         StatusCode::Redirect,
      published:      Some(now),
      expires:        None,
      updated:        now,
      author_id:      String::new(),
      template_id:    None,
    };

    self
      .store
      .insert_document(stub.clone())
      .await
      .map_err(Error::store)?;
    self
      .store
      .insert_live_page(LivePage::from_document(&stub))
      .await
      .map_err(Error::store)?;
    self.refresh_catalog(page).await?;
    tracing::info!(page, from, to, "redirect created");

    if self.config.static_export {
      let model = json!({ "slug": from, "target": to });
      match self.services.renderer().render("redirect", &model).await {
        Ok(html) => {
          let path = slug::export_path(from);
          if let Err(e) = self
            .services
            .blobs()
            .write(path.clone(), Bytes::from(html), "text/html".to_owned())
            .await
          {
            tracing::warn!(%path, error = %e, "failed to export redirect page");
          }
        }
        Err(e) => tracing::warn!(from, error = %e, "failed to render redirect page"),
      }
    }

    Ok(stub)
  }

  /// Drop redirect stubs whose source slug is `slug`; they would shadow a
  /// page that now owns it.
  pub(crate) async fn remove_redirects_at(&self, slug: &str) -> Result<()> {
    for stub in self
      .store
      .redirects_involving(slug)
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|r| r.slug == slug)
    {
      self.remove_redirect_stub(&stub).await?;
    }
    Ok(())
  }

  async fn remove_redirect_stub(&self, stub: &Document) -> Result<()> {
    self.remove_page_rows(stub.page_number).await?;
    tracing::info!(page = stub.page_number, from = %stub.slug, to = %stub.content, "redirect removed");
    Ok(())
  }

  /// Physically delete every row belonging to `page`: versions, catalog
  /// entry and live rows including redirects.
  pub(crate) async fn remove_page_rows(&self, page: PageNumber) -> Result<()> {
    self
      .store
      .delete_live_pages(page, true)
      .await
      .map_err(Error::store)?;
    self
      .store
      .delete_catalog_entry(page)
      .await
      .map_err(Error::store)?;
    self
      .store
      .delete_page_documents(page)
      .await
      .map_err(Error::store)?;
    Ok(())
  }
}
