//! SQL schema for the Vellum SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Single-row counters advanced with UPDATE ... RETURNING, which SQLite
-- applies atomically.
CREATE TABLE IF NOT EXISTS sequences (
    name  TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
INSERT OR IGNORE INTO sequences (name, value) VALUES ('page', 0);

CREATE TABLE IF NOT EXISTS documents (
    id             TEXT PRIMARY KEY,
    page_number    INTEGER NOT NULL,
    version_number INTEGER NOT NULL,
    title          TEXT NOT NULL,
    slug           TEXT NOT NULL,
    content        TEXT NOT NULL,
    status_code    INTEGER NOT NULL,   -- 0 active | 1 inactive | 2 deleted | 3 redirect
    published      TEXT,               -- RFC 3339 UTC or NULL for drafts
    expires        TEXT,
    updated        TEXT NOT NULL,
    author_id      TEXT NOT NULL,
    template_id    TEXT,
    UNIQUE (page_number, version_number),
    CHECK  (version_number >= 1)
);

CREATE INDEX IF NOT EXISTS documents_page_idx  ON documents(page_number);
CREATE INDEX IF NOT EXISTS documents_slug_idx  ON documents(slug);
CREATE INDEX IF NOT EXISTS documents_title_idx ON documents(title COLLATE NOCASE);

-- One row per page; rebuilt wholesale on every mutation.
CREATE TABLE IF NOT EXISTS catalog_entries (
    page_number  INTEGER PRIMARY KEY,
    title        TEXT NOT NULL,
    slug         TEXT NOT NULL,
    status_code  INTEGER NOT NULL,
    published    TEXT,
    updated      TEXT NOT NULL,
    author_id    TEXT NOT NULL,
    author_name  TEXT,
    permissions  TEXT NOT NULL DEFAULT '[]',   -- JSON array of Permission
    intro        TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS live_pages (
    id           TEXT PRIMARY KEY,
    page_number  INTEGER NOT NULL,
    slug         TEXT NOT NULL,
    parent_slug  TEXT,
    title        TEXT NOT NULL,
    status_code  INTEGER NOT NULL,
    published    TEXT,
    expires      TEXT,
    content      TEXT NOT NULL,
    updated      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS live_pages_page_idx ON live_pages(page_number);
CREATE INDEX IF NOT EXISTS live_pages_slug_idx ON live_pages(slug);

CREATE TABLE IF NOT EXISTS reserved_slugs (
    path            TEXT PRIMARY KEY,
    cosmos_required INTEGER NOT NULL DEFAULT 0,
    notes           TEXT
);

CREATE TABLE IF NOT EXISTS templates (
    id      TEXT PRIMARY KEY,
    title   TEXT NOT NULL,
    content TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS pending_purges (
    path      TEXT PRIMARY KEY,
    queued_at TEXT NOT NULL
);

PRAGMA user_version = 1;
";
