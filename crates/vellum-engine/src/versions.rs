//! Version creation and saving.
//!
//! Drafts are edited in place. Saving over a version that already carries a
//! publication date inserts a new version instead, so published content is
//! never rewritten.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use vellum_core::{
  PageNumber,
  collab::{Collaborators, Notifier as _},
  page::{Document, DocumentEdit, ROOT_SLUG, StatusCode},
  store::PageStore,
};

use crate::{Engine, Error, Result, locks::CREATE_KEY};

impl<S, C> Engine<S, C>
where
  S: PageStore,
  C: Collaborators,
{
  /// Create a new page at version 1.
  ///
  /// Content comes from `template_id` when given, otherwise from the
  /// configured placeholder. The very first page in an empty store becomes
  /// the home page: its slug is `root` and it is published immediately.
  pub async fn create_document(
    &self,
    title: &str,
    author_id: &str,
    template_id: Option<Uuid>,
  ) -> Result<Document> {
    let _guard = self.locks.lock(CREATE_KEY).await;

    let slug = self.validate_title(title, None).await?;

    let content = match template_id {
      Some(id) => {
        self
          .store
          .get_template(id)
          .await
          .map_err(Error::store)?
          .ok_or(vellum_core::Error::TemplateNotFound(id))?
          .content
      }
      None => self.config.default_content.clone(),
    };
    let content = self.sanitize(&content);

    let is_first = self.store.count_documents().await.map_err(Error::store)? == 0;
    let page = self.store.next_page_number().await.map_err(Error::store)?;
    let now = Utc::now();

    let doc = Document {
      id: Uuid::new_v4(),
      page_number: page,
      version_number: 1,
      title: title.trim().to_owned(),
      slug: if is_first { ROOT_SLUG.to_owned() } else { slug },
      content,
      status: StatusCode::Active,
      published: is_first.then_some(now),
      expires: None,
      updated: now,
      author_id: author_id.to_owned(),
      template_id,
    };

    let _page_guard = self.locks.lock(page).await;
    self
      .store
      .insert_document(doc.clone())
      .await
      .map_err(Error::store)?;
    tracing::info!(page, slug = %doc.slug, home = is_first, "page created");

    if !is_first {
      self.remove_redirects_at(&doc.slug).await?;
    }
    self.project(page, Vec::new()).await?;

    Ok(doc)
  }

  /// Save an edit of an existing version.
  ///
  /// Title changes go through the rename cascade; a publication date in the
  /// edit publishes the saved version. Returns the version as stored.
  pub async fn save_document(&self, edit: DocumentEdit, author_id: &str) -> Result<Document> {
    let page = self.get_document(edit.id).await?.page_number;
    let _guard = self.locks.lock(page).await;

    // Re-read under the lock.
    let stored = self.get_document(edit.id).await?;
    if stored.is_deleted() || stored.is_redirect() {
      return Err(vellum_core::Error::PageNotFound(page).into());
    }
    let versions = self.list_versions(page).await?;
    let Some(latest) = versions.last() else {
      return Err(vellum_core::Error::PageNotFound(page).into());
    };

    let title = edit.title.trim().to_owned();
    let old_slug = latest.slug.clone();
    let rename = if title == latest.title {
      None
    } else if old_slug == ROOT_SLUG {
      Some(self.validate_root_title(&title, page).await?)
    } else {
      let new_slug = self.validate_title(&title, Some(page)).await?;
      self.check_cascade(&old_slug, &title, &new_slug).await?;
      Some(new_slug)
    };
    let was_published = versions.iter().any(|v| v.published.is_some());

    let now = Utc::now();
    let copy_on_write = stored.published.is_some();
    let mut doc = if copy_on_write {
      Document {
        id: Uuid::new_v4(),
        version_number: latest.version_number + 1,
        published: None,
        expires: None,
        ..stored
      }
    } else {
      stored
    };
    doc.title = title.clone();
    doc.content = self.sanitize(&edit.content);
    doc.updated = now;
    doc.author_id = author_id.to_owned();

    if copy_on_write {
      self
        .store
        .insert_document(doc.clone())
        .await
        .map_err(Error::store)?;
    } else {
      self
        .store
        .update_document(doc.clone())
        .await
        .map_err(Error::store)?;
    }
    tracing::info!(
      page,
      version = doc.version_number,
      new_version = copy_on_write,
      "document saved"
    );

    let mut extra_paths = Vec::new();
    if let Some(new_slug) = rename {
      extra_paths = self
        .rename_cascade(page, &old_slug, &title, &new_slug, was_published)
        .await?;
    }

    let saved = match edit.published {
      Some(at) => self.publish_locked(doc.id, at, extra_paths).await?,
      None => {
        self.project(page, extra_paths).await?;
        self.get_document(doc.id).await?
      }
    };

    self.notify_saved(&saved);
    Ok(saved)
  }

  /// Copy `document_id` into a new draft at the end of its page's history.
  /// The copy keeps the page's current title and slug.
  pub async fn new_version(&self, document_id: Uuid, author_id: &str) -> Result<Document> {
    let page = self.get_document(document_id).await?.page_number;
    let _guard = self.locks.lock(page).await;

    let source = self.get_document(document_id).await?;
    if source.is_deleted() || source.is_redirect() {
      return Err(vellum_core::Error::PageNotFound(page).into());
    }
    let latest = self.latest_version(page).await?;

    let doc = Document {
      id: Uuid::new_v4(),
      version_number: latest.version_number + 1,
      title: latest.title,
      slug: latest.slug,
      status: latest.status,
      published: None,
      expires: None,
      updated: Utc::now(),
      author_id: author_id.to_owned(),
      ..source
    };
    self
      .store
      .insert_document(doc.clone())
      .await
      .map_err(Error::store)?;
    tracing::info!(page, version = doc.version_number, from = %document_id, "version created");

    self.refresh_catalog(page).await?;
    Ok(doc)
  }

  pub(crate) async fn latest_version(&self, page: PageNumber) -> Result<Document> {
    self
      .store
      .latest_version(page)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| vellum_core::Error::PageNotFound(page).into())
  }

  fn notify_saved(&self, doc: &Document) {
    let regions = vellum_html::region_ids(&doc.content).unwrap_or_default();
    self.services.notifier().broadcast(
      "page_saved",
      json!({
        "page_number": doc.page_number,
        "version": doc.version_number,
        "document_id": doc.id,
        "regions": regions,
      }),
    );
  }
}
