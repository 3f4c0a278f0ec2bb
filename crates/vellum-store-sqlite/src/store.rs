//! [`SqliteStore`], the SQLite implementation of [`PageStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use vellum_core::{
  PageNumber,
  catalog::{CatalogEntry, LivePage, ReservedSlug, default_reserved},
  page::{Document, StatusCode, Template},
  slug,
  store::PageStore,
};

use crate::{
  Error, Result,
  encode::{
    CATALOG_COLUMNS, DOCUMENT_COLUMNS, LIVE_PAGE_COLUMNS, RawCatalogEntry, RawDocument,
    RawLivePage, RawTemplate, encode_dt, encode_permissions, encode_uuid, reserved_from_row,
  },
  schema::SCHEMA,
};

/// Deleted and redirect rows, excluded from uniqueness checks and
/// hierarchy lookups.
const HIDDEN_STATUSES: &str = "(2, 3)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Vellum page store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let defaults = default_reserved();
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(SCHEMA)?;
        let tx = conn.transaction()?;
        for reserved in defaults {
          tx.execute(
            "INSERT OR IGNORE INTO reserved_slugs (path, cosmos_required, notes)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![reserved.path, reserved.cosmos_required, reserved.notes],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT` over [`DOCUMENT_COLUMNS`] with positional parameters.
  async fn query_documents(&self, sql: String, params: Vec<Value>) -> Result<Vec<Document>> {
    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawDocument::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn query_live_pages(&self, sql: String, params: Vec<Value>) -> Result<Vec<LivePage>> {
    let raws: Vec<RawLivePage> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawLivePage::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLivePage::into_live_page).collect()
  }

  async fn query_exists(&self, sql: &'static str, params: Vec<Value>) -> Result<bool> {
    let found = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params_from_iter(params), |_| Ok(()))
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(found)
  }

  async fn query_page_numbers(&self, sql: &'static str) -> Result<Vec<PageNumber>> {
    let numbers = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<PageNumber>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(numbers)
  }
}

fn exclude_param(exclude: Option<PageNumber>) -> Value {
  exclude.map_or(Value::Null, Value::Integer)
}

// ─── PageStore impl ──────────────────────────────────────────────────────────

impl PageStore for SqliteStore {
  type Error = Error;

  // ── Sequence ──────────────────────────────────────────────────────────────

  async fn next_page_number(&self) -> Result<PageNumber> {
    let next = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "UPDATE sequences SET value = value + 1 WHERE name = 'page' RETURNING value",
          [],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(next)
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn insert_document(&self, doc: Document) -> Result<()> {
    let raw = RawDocument::from_document(&doc);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (
             id, page_number, version_number, title, slug, content,
             status_code, published, expires, updated, author_id, template_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            raw.id,
            raw.page_number,
            raw.version_number,
            raw.title,
            raw.slug,
            raw.content,
            raw.status_code,
            raw.published,
            raw.expires,
            raw.updated,
            raw.author_id,
            raw.template_id,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_document(&self, doc: Document) -> Result<()> {
    let raw = RawDocument::from_document(&doc);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE documents SET
             page_number = ?2, version_number = ?3, title = ?4, slug = ?5,
             content = ?6, status_code = ?7, published = ?8, expires = ?9,
             updated = ?10, author_id = ?11, template_id = ?12
           WHERE id = ?1",
          rusqlite::params![
            raw.id,
            raw.page_number,
            raw.version_number,
            raw.title,
            raw.slug,
            raw.content,
            raw.status_code,
            raw.published,
            raw.expires,
            raw.updated,
            raw.author_id,
            raw.template_id,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::DocumentNotFound(doc.id));
    }
    Ok(())
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1");
    let docs = self
      .query_documents(sql, vec![Value::Text(encode_uuid(id))])
      .await?;
    Ok(docs.into_iter().next())
  }

  async fn versions(&self, page: PageNumber) -> Result<Vec<Document>> {
    let sql = format!(
      "SELECT {DOCUMENT_COLUMNS} FROM documents
       WHERE page_number = ?1 ORDER BY version_number"
    );
    self.query_documents(sql, vec![Value::Integer(page)]).await
  }

  async fn latest_version(&self, page: PageNumber) -> Result<Option<Document>> {
    let sql = format!(
      "SELECT {DOCUMENT_COLUMNS} FROM documents
       WHERE page_number = ?1 ORDER BY version_number DESC LIMIT 1"
    );
    let docs = self.query_documents(sql, vec![Value::Integer(page)]).await?;
    Ok(docs.into_iter().next())
  }

  async fn page_numbers(&self) -> Result<Vec<PageNumber>> {
    self
      .query_page_numbers("SELECT DISTINCT page_number FROM documents ORDER BY page_number")
      .await
  }

  async fn count_documents(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  async fn delete_page_documents(&self, page: PageNumber) -> Result<usize> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents WHERE page_number = ?1",
          rusqlite::params![page],
        )?)
      })
      .await?;
    Ok(removed)
  }

  async fn slug_in_use(&self, slug: &str, exclude: Option<PageNumber>) -> Result<bool> {
    self
      .query_exists(
        "SELECT 1 FROM documents
         WHERE slug = ?1 AND status_code NOT IN (2, 3)
           AND (?2 IS NULL OR page_number != ?2) LIMIT 1",
        vec![Value::Text(slug.to_owned()), exclude_param(exclude)],
      )
      .await
  }

  async fn title_in_use(&self, title: &str, exclude: Option<PageNumber>) -> Result<bool> {
    self
      .query_exists(
        "SELECT 1 FROM documents
         WHERE title = ?1 COLLATE NOCASE AND status_code NOT IN (2, 3)
           AND (?2 IS NULL OR page_number != ?2) LIMIT 1",
        vec![Value::Text(title.trim().to_owned()), exclude_param(exclude)],
      )
      .await
  }

  async fn descendants(&self, parent: &str) -> Result<Vec<Document>> {
    let (lower, upper) = slug::descendant_range(parent);
    let sql = format!(
      "SELECT {DOCUMENT_COLUMNS} FROM documents
       WHERE slug >= ?1 AND slug < ?2 AND status_code NOT IN {HIDDEN_STATUSES}
       ORDER BY slug, version_number"
    );
    self
      .query_documents(sql, vec![Value::Text(lower), Value::Text(upper)])
      .await
  }

  async fn redirects_involving(&self, target: &str) -> Result<Vec<Document>> {
    let sql = format!(
      "SELECT {DOCUMENT_COLUMNS} FROM documents
       WHERE status_code = ?1 AND (slug = ?2 OR content = ?2)
       ORDER BY page_number"
    );
    self
      .query_documents(sql, vec![
        Value::Integer(StatusCode::Redirect.code()),
        Value::Text(target.to_owned()),
      ])
      .await
  }

  // ── Reserved paths and templates ──────────────────────────────────────────

  async fn reserved_slugs(&self) -> Result<Vec<ReservedSlug>> {
    let reserved = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT path, cosmos_required, notes FROM reserved_slugs ORDER BY path")?;
        let rows = stmt
          .query_map([], reserved_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(reserved)
  }

  async fn add_reserved_slug(&self, reserved: ReservedSlug) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reserved_slugs (path, cosmos_required, notes) VALUES (?1, ?2, ?3)
           ON CONFLICT (path) DO UPDATE SET
             cosmos_required = excluded.cosmos_required, notes = excluded.notes",
          rusqlite::params![reserved.path, reserved.cosmos_required, reserved.notes],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_reserved_slug(&self, path: &str) -> Result<bool> {
    let path = path.to_owned();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM reserved_slugs WHERE path = ?1", rusqlite::params![path])?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn get_template(&self, id: Uuid) -> Result<Option<Template>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawTemplate> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT id, title, content FROM templates WHERE id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawTemplate {
                  id:      row.get(0)?,
                  title:   row.get(1)?,
                  content: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawTemplate::into_template).transpose()
  }

  async fn add_template(&self, template: Template) -> Result<()> {
    let id_str = encode_uuid(template.id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO templates (id, title, content) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, template.title, template.content],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  async fn get_catalog_entry(&self, page: PageNumber) -> Result<Option<CatalogEntry>> {
    let raw: Option<RawCatalogEntry> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CATALOG_COLUMNS} FROM catalog_entries WHERE page_number = ?1"),
              rusqlite::params![page],
              RawCatalogEntry::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawCatalogEntry::into_entry).transpose()
  }

  async fn replace_catalog_entry(&self, entry: CatalogEntry) -> Result<()> {
    let permissions = encode_permissions(&entry.permissions)?;
    let published = entry.published.map(encode_dt);
    let updated = encode_dt(entry.updated);
    let status = entry.status.code();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM catalog_entries WHERE page_number = ?1",
          rusqlite::params![entry.page_number],
        )?;
        tx.execute(
          "INSERT INTO catalog_entries (
             page_number, title, slug, status_code, published, updated,
             author_id, author_name, permissions, intro
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            entry.page_number,
            entry.title,
            entry.slug,
            status,
            published,
            updated,
            entry.author_id,
            entry.author_name,
            permissions,
            entry.intro,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_catalog_entry(&self, page: PageNumber) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM catalog_entries WHERE page_number = ?1",
          rusqlite::params![page],
        )?)
      })
      .await?;
    Ok(removed > 0)
  }

  async fn list_catalog(&self) -> Result<Vec<CatalogEntry>> {
    let raws: Vec<RawCatalogEntry> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CATALOG_COLUMNS} FROM catalog_entries ORDER BY slug"
        ))?;
        let rows = stmt
          .query_map([], RawCatalogEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawCatalogEntry::into_entry).collect()
  }

  // ── Live pages ────────────────────────────────────────────────────────────

  async fn live_pages(&self, page: PageNumber) -> Result<Vec<LivePage>> {
    let sql = format!(
      "SELECT {LIVE_PAGE_COLUMNS} FROM live_pages WHERE page_number = ?1 ORDER BY published"
    );
    self.query_live_pages(sql, vec![Value::Integer(page)]).await
  }

  async fn live_pages_by_slug(&self, slug: &str) -> Result<Vec<LivePage>> {
    let sql = format!(
      "SELECT {LIVE_PAGE_COLUMNS} FROM live_pages WHERE slug = ?1 ORDER BY published"
    );
    self
      .query_live_pages(sql, vec![Value::Text(slug.to_owned())])
      .await
  }

  async fn live_page_numbers(&self) -> Result<Vec<PageNumber>> {
    self
      .query_page_numbers("SELECT DISTINCT page_number FROM live_pages ORDER BY page_number")
      .await
  }

  async fn insert_live_page(&self, page: LivePage) -> Result<()> {
    let id_str = encode_uuid(page.id);
    let published = page.published.map(encode_dt);
    let expires = page.expires.map(encode_dt);
    let updated = encode_dt(page.updated);
    let status = page.status.code();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO live_pages (
             id, page_number, slug, parent_slug, title, status_code,
             published, expires, content, updated
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            id_str,
            page.page_number,
            page.slug,
            page.parent_slug,
            page.title,
            status,
            published,
            expires,
            page.content,
            updated,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_live_pages(&self, page: PageNumber, include_redirects: bool) -> Result<usize> {
    let redirect = StatusCode::Redirect.code();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM live_pages
           WHERE page_number = ?1 AND (?2 OR status_code != ?3)",
          rusqlite::params![page, include_redirects, redirect],
        )?)
      })
      .await?;
    Ok(removed)
  }

  // ── Deferred cache purges ─────────────────────────────────────────────────

  async fn enqueue_purge(&self, paths: Vec<String>) -> Result<()> {
    let queued_at = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for path in paths {
          tx.execute(
            "INSERT OR IGNORE INTO pending_purges (path, queued_at) VALUES (?1, ?2)",
            rusqlite::params![path, queued_at],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn take_pending_purges(&self) -> Result<Vec<String>> {
    let paths = self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        let paths = {
          let mut stmt = tx.prepare("SELECT path FROM pending_purges ORDER BY queued_at, path")?;
          stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?
        };
        tx.execute("DELETE FROM pending_purges", [])?;
        tx.commit()?;
        Ok(paths)
      })
      .await?;
    Ok(paths)
  }
}
