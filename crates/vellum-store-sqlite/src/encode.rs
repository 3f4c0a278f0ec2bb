//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, status codes as integers and permission lists as compact JSON.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use vellum_core::{
  PageNumber,
  catalog::{CatalogEntry, LivePage, Permission, ReservedSlug},
  page::{Document, StatusCode, Template},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

pub fn encode_permissions(permissions: &[Permission]) -> Result<String> {
  Ok(serde_json::to_string(permissions)?)
}

// ─── Documents ───────────────────────────────────────────────────────────────

pub const DOCUMENT_COLUMNS: &str = "id, page_number, version_number, title, slug, content, \
   status_code, published, expires, updated, author_id, template_id";

/// Raw values read directly from a `documents` row.
pub struct RawDocument {
  pub id:             String,
  pub page_number:    PageNumber,
  pub version_number: u32,
  pub title:          String,
  pub slug:           String,
  pub content:        String,
  pub status_code:    i64,
  pub published:      Option<String>,
  pub expires:        Option<String>,
  pub updated:        String,
  pub author_id:      String,
  pub template_id:    Option<String>,
}

impl RawDocument {
  /// Map a row selected with [`DOCUMENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      page_number:    row.get(1)?,
      version_number: row.get(2)?,
      title:          row.get(3)?,
      slug:           row.get(4)?,
      content:        row.get(5)?,
      status_code:    row.get(6)?,
      published:      row.get(7)?,
      expires:        row.get(8)?,
      updated:        row.get(9)?,
      author_id:      row.get(10)?,
      template_id:    row.get(11)?,
    })
  }

  pub fn into_document(self) -> Result<Document> {
    Ok(Document {
      id:             decode_uuid(&self.id)?,
      page_number:    self.page_number,
      version_number: self.version_number,
      title:          self.title,
      slug:           self.slug,
      content:        self.content,
      status:         StatusCode::from_code(self.status_code)?,
      published:      decode_opt_dt(self.published)?,
      expires:        decode_opt_dt(self.expires)?,
      updated:        decode_dt(&self.updated)?,
      author_id:      self.author_id,
      template_id:    self.template_id.as_deref().map(decode_uuid).transpose()?,
    })
  }

  pub fn from_document(doc: &Document) -> Self {
    Self {
      id:             encode_uuid(doc.id),
      page_number:    doc.page_number,
      version_number: doc.version_number,
      title:          doc.title.clone(),
      slug:           doc.slug.clone(),
      content:        doc.content.clone(),
      status_code:    doc.status.code(),
      published:      doc.published.map(encode_dt),
      expires:        doc.expires.map(encode_dt),
      updated:        encode_dt(doc.updated),
      author_id:      doc.author_id.clone(),
      template_id:    doc.template_id.map(encode_uuid),
    }
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

pub const CATALOG_COLUMNS: &str = "page_number, title, slug, status_code, published, updated, \
   author_id, author_name, permissions, intro";

pub struct RawCatalogEntry {
  pub page_number: PageNumber,
  pub title:       String,
  pub slug:        String,
  pub status_code: i64,
  pub published:   Option<String>,
  pub updated:     String,
  pub author_id:   String,
  pub author_name: Option<String>,
  pub permissions: String,
  pub intro:       String,
}

impl RawCatalogEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      page_number: row.get(0)?,
      title:       row.get(1)?,
      slug:        row.get(2)?,
      status_code: row.get(3)?,
      published:   row.get(4)?,
      updated:     row.get(5)?,
      author_id:   row.get(6)?,
      author_name: row.get(7)?,
      permissions: row.get(8)?,
      intro:       row.get(9)?,
    })
  }

  pub fn into_entry(self) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
      page_number: self.page_number,
      title:       self.title,
      slug:        self.slug,
      status:      StatusCode::from_code(self.status_code)?,
      published:   decode_opt_dt(self.published)?,
      updated:     decode_dt(&self.updated)?,
      author_id:   self.author_id,
      author_name: self.author_name,
      permissions: serde_json::from_str(&self.permissions)?,
      intro:       self.intro,
    })
  }
}

// ─── Live pages ──────────────────────────────────────────────────────────────

pub const LIVE_PAGE_COLUMNS: &str = "id, page_number, slug, parent_slug, title, status_code, \
   published, expires, content, updated";

pub struct RawLivePage {
  pub id:          String,
  pub page_number: PageNumber,
  pub slug:        String,
  pub parent_slug: Option<String>,
  pub title:       String,
  pub status_code: i64,
  pub published:   Option<String>,
  pub expires:     Option<String>,
  pub content:     String,
  pub updated:     String,
}

impl RawLivePage {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      page_number: row.get(1)?,
      slug:        row.get(2)?,
      parent_slug: row.get(3)?,
      title:       row.get(4)?,
      status_code: row.get(5)?,
      published:   row.get(6)?,
      expires:     row.get(7)?,
      content:     row.get(8)?,
      updated:     row.get(9)?,
    })
  }

  pub fn into_live_page(self) -> Result<LivePage> {
    Ok(LivePage {
      id:          decode_uuid(&self.id)?,
      page_number: self.page_number,
      slug:        self.slug,
      parent_slug: self.parent_slug,
      title:       self.title,
      status:      StatusCode::from_code(self.status_code)?,
      published:   decode_opt_dt(self.published)?,
      expires:     decode_opt_dt(self.expires)?,
      content:     self.content,
      updated:     decode_dt(&self.updated)?,
    })
  }
}

// ─── Reserved paths and templates ────────────────────────────────────────────

pub fn reserved_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReservedSlug> {
  Ok(ReservedSlug {
    path:            row.get(0)?,
    cosmos_required: row.get(1)?,
    notes:           row.get(2)?,
  })
}

pub struct RawTemplate {
  pub id:      String,
  pub title:   String,
  pub content: String,
}

impl RawTemplate {
  pub fn into_template(self) -> Result<Template> {
    Ok(Template {
      id:      decode_uuid(&self.id)?,
      title:   self.title,
      content: self.content,
    })
  }
}
