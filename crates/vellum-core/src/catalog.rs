//! Projections derived from document versions: the per-page catalog row, the
//! publicly served live rows, and reserved URL paths.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  PageNumber,
  page::{Document, StatusCode},
  slug,
};

// ─── Permissions ─────────────────────────────────────────────────────────────

/// Access granted to a user or role on a page. Principals are owned by the
/// identity directory; only their ids are stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
  pub principal_id: String,
  pub is_role:      bool,
  pub permission:   String,
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

/// One denormalised summary row per page, rebuilt on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub page_number: PageNumber,
  pub title:       String,
  pub slug:        String,
  pub status:      StatusCode,
  pub published:   Option<DateTime<Utc>>,
  pub updated:     DateTime<Utc>,
  pub author_id:   String,
  /// Display name resolved through the identity directory, if known.
  pub author_name: Option<String>,
  pub permissions: Vec<Permission>,
  /// First non-empty paragraph of the latest content, as plain text.
  pub intro:       String,
}

// ─── Live pages ──────────────────────────────────────────────────────────────

/// A publicly served row. Non-redirect rows for the same slug have disjoint
/// `[published, expires)` windows; redirect rows never expire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePage {
  pub id:          Uuid,
  pub page_number: PageNumber,
  pub slug:        String,
  pub parent_slug: Option<String>,
  pub title:       String,
  pub status:      StatusCode,
  pub published:   Option<DateTime<Utc>>,
  pub expires:     Option<DateTime<Utc>>,
  pub content:     String,
  pub updated:     DateTime<Utc>,
}

impl LivePage {
  /// Build the live row served for `doc`. The row reuses the version id.
  pub fn from_document(doc: &Document) -> Self {
    Self {
      id:          doc.id,
      page_number: doc.page_number,
      slug:        doc.slug.clone(),
      parent_slug: slug::parent(&doc.slug).map(str::to_owned),
      title:       doc.title.clone(),
      status:      doc.status,
      published:   doc.published,
      expires:     doc.expires,
      content:     doc.content.clone(),
      updated:     doc.updated,
    }
  }

  pub fn is_redirect(&self) -> bool { self.status == StatusCode::Redirect }

  pub fn is_visible_at(&self, at: DateTime<Utc>) -> bool {
    if self.is_redirect() {
      return true;
    }
    match self.published {
      Some(published) if published <= at => {
        self.expires.is_none_or(|expires| expires > at)
      }
      _ => false,
    }
  }
}

// ─── Reserved paths ──────────────────────────────────────────────────────────

/// A URL path pages may not claim. A trailing `*` makes it a prefix wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedSlug {
  pub path:            String,
  /// Required by the platform itself; cannot be removed.
  pub cosmos_required: bool,
  pub notes:           Option<String>,
}

impl ReservedSlug {
  pub fn new(path: impl Into<String>, notes: impl Into<String>) -> Self {
    Self {
      path:            path.into(),
      cosmos_required: true,
      notes:           Some(notes.into()),
    }
  }

  /// Whether `candidate` (an already-normalised slug) is blocked by this
  /// entry.
  pub fn blocks(&self, candidate: &str) -> bool {
    let path = self.path.trim().to_lowercase();
    match path.strip_suffix('*') {
      Some(prefix) => candidate.starts_with(prefix),
      None => candidate == path.trim_matches('/'),
    }
  }
}

/// Paths seeded into every new store.
pub fn default_reserved() -> Vec<ReservedSlug> {
  vec![
    ReservedSlug::new("root", "Home page"),
    ReservedSlug::new("admin", "Administration"),
    ReservedSlug::new("api/*", "Service endpoints"),
    ReservedSlug::new("pub/*", "Uploaded assets"),
    ReservedSlug::new("identity/*", "Sign-in pages"),
    ReservedSlug::new("editor/*", "Editor"),
  ]
}
