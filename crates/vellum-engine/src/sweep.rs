//! The reconciliation sweep.
//!
//! Operations are sequences of independent writes, so a crash or a failed
//! collaborator call can leave the catalog, the live rows or the cache out of
//! step with the stored versions. The sweep walks every page and re-applies
//! the projections, which are idempotent.

use std::{collections::HashSet, sync::PoisonError};

use chrono::Utc;
use serde::Serialize;
use vellum_core::{PageNumber, collab::Collaborators, store::PageStore};

use crate::{Engine, Error, Result};

/// What a sweep changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
  pub pages_checked:   usize,
  pub catalog_created: usize,
  pub catalog_removed: usize,
  pub live_repaired:   usize,
  pub live_removed:    usize,
  pub purges_retried:  usize,
  pub failures:        usize,
}

impl SweepReport {
  pub fn is_clean(&self) -> bool {
    self.catalog_created == 0
      && self.catalog_removed == 0
      && self.live_repaired == 0
      && self.live_removed == 0
      && self.failures == 0
  }
}

impl<S, C> Engine<S, C>
where
  S: PageStore,
  C: Collaborators,
{
  /// Repair catalog and live-page drift, then retry queued cache purges.
  pub async fn check_catalog_entries(&self) -> Result<SweepReport> {
    let started = Utc::now();
    let since = *self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
    let mut report = SweepReport::default();

    let pages = self.store.page_numbers().await.map_err(Error::store)?;
    for &page in &pages {
      report.pages_checked += 1;
      if let Err(e) = self.sweep_page(page, since, &mut report).await {
        tracing::warn!(page, error = %e, "sweep failed for page");
        report.failures += 1;
      }
    }

    let known: HashSet<PageNumber> = pages.into_iter().collect();
    for entry in self.store.list_catalog().await.map_err(Error::store)? {
      if !known.contains(&entry.page_number) {
        self
          .store
          .delete_catalog_entry(entry.page_number)
          .await
          .map_err(Error::store)?;
        tracing::info!(page = entry.page_number, "orphaned catalog entry removed");
        report.catalog_removed += 1;
      }
    }
    for page in self.store.live_page_numbers().await.map_err(Error::store)? {
      if !known.contains(&page) {
        let removed = self
          .store
          .delete_live_pages(page, true)
          .await
          .map_err(Error::store)?;
        tracing::info!(page, rows = removed, "orphaned live pages removed");
        report.live_removed += removed;
      }
    }

    self.retry_purges(&mut report).await?;

    *self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner) = Some(started);
    if report.is_clean() {
      tracing::debug!(?report, "sweep finished");
    } else {
      tracing::info!(?report, "sweep finished");
    }
    Ok(report)
  }

  async fn sweep_page(
    &self,
    page: PageNumber,
    since: Option<chrono::DateTime<Utc>>,
    report: &mut SweepReport,
  ) -> Result<()> {
    let _guard = self.locks.lock(page).await;

    let versions = self.store.versions(page).await.map_err(Error::store)?;
    let Some(latest) = versions.last() else {
      return Ok(());
    };

    if latest.is_deleted() {
      if self
        .store
        .delete_catalog_entry(page)
        .await
        .map_err(Error::store)?
      {
        report.catalog_removed += 1;
      }
      report.live_removed += self
        .store
        .delete_live_pages(page, true)
        .await
        .map_err(Error::store)?;
      return Ok(());
    }

    let had_entry = self
      .store
      .get_catalog_entry(page)
      .await
      .map_err(Error::store)?
      .is_some();
    self.refresh_catalog(page).await?;
    if !had_entry {
      tracing::info!(page, "missing catalog entry recreated");
      report.catalog_created += 1;
    }

    // A version whose scheduled time passed since the last sweep needs its
    // export and cache purge even though its live row already exists.
    let now = Utc::now();
    let went_live = since.is_some_and(|since| {
      versions
        .iter()
        .any(|v| v.published.is_some_and(|p| p > since && p <= now))
    });
    if self.materialize(page, Vec::new(), went_live).await? {
      report.live_repaired += 1;
    }
    Ok(())
  }

  async fn retry_purges(&self, report: &mut SweepReport) -> Result<()> {
    let mut pending = self.store.take_pending_purges().await.map_err(Error::store)?;
    if pending.is_empty() {
      return Ok(());
    }
    pending.sort();
    pending.dedup();

    match self.send_purge(pending.clone()).await {
      Ok(()) => {
        tracing::info!(paths = pending.len(), "queued cache purges sent");
        report.purges_retried += pending.len();
      }
      Err(reason) => {
        tracing::warn!(%reason, "queued cache purge failed again");
        report.failures += 1;
        self
          .store
          .enqueue_purge(pending)
          .await
          .map_err(Error::store)?;
      }
    }
    Ok(())
  }
}
