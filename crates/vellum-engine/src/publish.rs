//! Publication scheduling: publish a version at an instant, and unpublish a
//! page.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vellum_core::{
  PageNumber, collab::Collaborators, page::Document, schedule, slug, store::PageStore,
};

use crate::{Engine, Error, Result};

impl<S, C> Engine<S, C>
where
  S: PageStore,
  C: Collaborators,
{
  /// Publish `document_id` at `at` (now when `None`). A future instant
  /// schedules the version; the page keeps serving its current version until
  /// then.
  pub async fn publish(&self, document_id: Uuid, at: Option<DateTime<Utc>>) -> Result<Document> {
    let page = self.get_document(document_id).await?.page_number;
    let _guard = self.locks.lock(page).await;
    self
      .publish_locked(document_id, at.unwrap_or_else(Utc::now), Vec::new())
      .await
  }

  /// Publish with the page lock already held. `extra_paths` are purged along
  /// with the page's own paths.
  pub(crate) async fn publish_locked(
    &self,
    document_id: Uuid,
    at: DateTime<Utc>,
    extra_paths: Vec<String>,
  ) -> Result<Document> {
    let target = self.get_document(document_id).await?;
    if target.is_deleted() || target.is_redirect() {
      return Err(vellum_core::Error::PageNotFound(target.page_number).into());
    }
    let page = target.page_number;
    let now = Utc::now();

    let versions = self.list_versions(page).await?;
    let others: Vec<Document> = versions
      .iter()
      .filter(|v| v.id != document_id && v.published.is_some())
      .cloned()
      .collect();
    let retained = schedule::retained_on_publish(&others, at, now);

    let mut next: Vec<Document> = versions
      .iter()
      .cloned()
      .map(|mut v| {
        if v.id == document_id {
          v.published = Some(at);
        } else if v.published.is_some() && !retained.contains(&v.id) {
          v.published = None;
        }
        v
      })
      .collect();
    let chain = schedule::expiration_chain(&next);
    for v in next.iter_mut() {
      v.expires = chain.get(&v.id).copied().flatten();
    }

    for (before, after) in versions.iter().zip(next.iter()) {
      if before.published != after.published || before.expires != after.expires {
        self
          .store
          .update_document(after.clone())
          .await
          .map_err(Error::store)?;
      }
    }

    let published = next
      .into_iter()
      .find(|v| v.id == document_id)
      .ok_or(vellum_core::Error::DocumentNotFound(document_id))?;
    tracing::info!(
      page,
      version = published.version_number,
      at = %at,
      scheduled = at > now,
      "version published"
    );

    self.project(page, extra_paths).await?;
    Ok(published)
  }

  /// Take a page offline: every version reverts to draft and its live rows
  /// and exports are removed. The home page cannot be unpublished.
  pub async fn unpublish(&self, page: PageNumber) -> Result<()> {
    let _guard = self.locks.lock(page).await;

    let versions = self.list_versions(page).await?;
    if versions.iter().any(Document::is_root) {
      return Err(vellum_core::Error::Forbidden("the home page cannot be unpublished".into()).into());
    }

    for mut v in versions.into_iter().filter(|v| v.published.is_some() || v.expires.is_some()) {
      v.published = None;
      v.expires = None;
      self.store.update_document(v).await.map_err(Error::store)?;
    }

    let removed = self.take_offline(page).await?;
    self.refresh_catalog(page).await?;
    tracing::info!(page, "page unpublished");

    let mut paths: Vec<String> = removed.iter().map(|s| slug::route_path(s)).collect();
    paths.sort();
    paths.dedup();
    self.purge_paths(page, paths).await;
    self.regenerate_site_indexes().await;
    Ok(())
  }
}
