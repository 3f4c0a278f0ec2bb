//! Publication scheduling as interval arithmetic.
//!
//! Each published version of a page owns the half-open window
//! `[published, next_published)`, where `next_published` is the publication
//! instant of the following version in `(published, version_number)` order.
//! The last window is open-ended. Equal timestamps are ordered by version
//! number, so the higher version wins and the lower one gets an empty window.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::page::Document;

/// Where a page is in its publication lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageState {
  /// No version carries a publication date.
  Draft,
  /// Only future publication dates exist.
  Scheduled,
  /// A version is visible now.
  Live,
}

fn order_key(doc: &Document) -> Option<(DateTime<Utc>, u32)> {
  doc.published.map(|published| (published, doc.version_number))
}

/// Ids of the `others` that keep their publication date when a version is
/// published at `at`.
///
/// - Publishing at or before `now`: only the latest version published on or
///   before `at` is kept, so it can be chained to the new one.
/// - Publishing after `now`: the version live at `now` is kept, as are any
///   versions scheduled strictly between `now` and `at`.
///
/// Everything else reverts to draft.
pub fn retained_on_publish(
  others: &[Document],
  at:     DateTime<Utc>,
  now:    DateTime<Utc>,
) -> HashSet<Uuid> {
  let cutoff = at.min(now);
  let mut retained = HashSet::new();

  if let Some(current) = others
    .iter()
    .filter(|doc| doc.published.is_some_and(|p| p <= cutoff))
    .max_by_key(|doc| order_key(doc))
  {
    retained.insert(current.id);
  }

  if at > now {
    retained.extend(
      others
        .iter()
        .filter(|doc| doc.published.is_some_and(|p| p > now && p < at))
        .map(|doc| doc.id),
    );
  }

  retained
}

/// Compute the `expires` value of every version in `versions`: each published
/// version expires when the next one is published; the last published
/// version and all drafts have no expiry.
pub fn expiration_chain(versions: &[Document]) -> HashMap<Uuid, Option<DateTime<Utc>>> {
  let mut published: Vec<&Document> =
    versions.iter().filter(|doc| doc.published.is_some()).collect();
  published.sort_by_key(|doc| order_key(doc));

  let mut chain: HashMap<Uuid, Option<DateTime<Utc>>> =
    versions.iter().map(|doc| (doc.id, None)).collect();
  for pair in published.windows(2) {
    chain.insert(pair[0].id, pair[1].published);
  }
  chain
}

/// The version visible at `at`, if any.
pub fn live_at(versions: &[Document], at: DateTime<Utc>) -> Option<&Document> {
  versions
    .iter()
    .filter(|doc| doc.is_visible_at(at))
    .max_by_key(|doc| order_key(doc))
}

/// Classify a page's versions at `now`.
pub fn page_state(versions: &[Document], now: DateTime<Utc>) -> PageState {
  if live_at(versions, now).is_some() {
    PageState::Live
  } else if versions.iter().any(|doc| doc.published.is_some_and(|p| p > now)) {
    PageState::Scheduled
  } else {
    PageState::Draft
  }
}
