//! Document versions, the unit of storage for page content.
//!
//! Every save of a published page produces a new [`Document`] row; drafts are
//! edited in place. All versions of one page share a [`PageNumber`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, FromRepr};
use uuid::Uuid;

use crate::{Error, PageNumber, Result};

/// Slug reserved for the home page.
pub const ROOT_SLUG: &str = "root";

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a document version. Persisted as an integer.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  FromRepr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[repr(i64)]
pub enum StatusCode {
  Active   = 0,
  Inactive = 1,
  Deleted  = 2,
  Redirect = 3,
}

impl StatusCode {
  pub fn code(self) -> i64 { self as i64 }

  pub fn from_code(code: i64) -> Result<Self> {
    Self::from_repr(code).ok_or(Error::UnknownStatus(code))
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// A single version of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub id:             Uuid,
  pub page_number:    PageNumber,
  /// Starts at 1 and increases without gaps per page.
  pub version_number: u32,
  pub title:          String,
  pub slug:           String,
  /// HTML body. For redirect stubs this holds the target slug.
  pub content:        String,
  pub status:         StatusCode,
  /// `None` means draft.
  pub published:      Option<DateTime<Utc>>,
  /// Derived by the scheduler; never set by callers.
  pub expires:        Option<DateTime<Utc>>,
  pub updated:        DateTime<Utc>,
  pub author_id:      String,
  pub template_id:    Option<Uuid>,
}

impl Document {
  pub fn is_root(&self) -> bool { self.slug == ROOT_SLUG }

  pub fn is_redirect(&self) -> bool { self.status == StatusCode::Redirect }

  pub fn is_deleted(&self) -> bool { self.status == StatusCode::Deleted }

  /// Whether this version is the one served at `at`: published on or before
  /// `at` and not yet expired.
  pub fn is_visible_at(&self, at: DateTime<Utc>) -> bool {
    match self.published {
      Some(published) if published <= at => {
        self.expires.is_none_or(|expires| expires > at)
      }
      _ => false,
    }
  }

  /// Whether this version still has a visibility window at or after `at`,
  /// i.e. it is live now or scheduled for later.
  pub fn has_window_after(&self, at: DateTime<Utc>) -> bool {
    self.published.is_some() && self.expires.is_none_or(|expires| expires > at)
  }
}

// ─── Edits ───────────────────────────────────────────────────────────────────

/// Input to a save: the edited fields of an existing version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEdit {
  /// The stored version the edit was based on.
  pub id:        Uuid,
  pub title:     String,
  pub content:   String,
  /// Requested publication instant; `None` leaves the page unpublished.
  pub published: Option<DateTime<Utc>>,
}

impl DocumentEdit {
  /// Start an edit from the current state of `doc`.
  pub fn from_document(doc: &Document) -> Self {
    Self {
      id:        doc.id,
      title:     doc.title.clone(),
      content:   doc.content.clone(),
      published: None,
    }
  }
}

// ─── Templates ───────────────────────────────────────────────────────────────

/// Starter content for new pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
  pub id:      Uuid,
  pub title:   String,
  pub content: String,
}
