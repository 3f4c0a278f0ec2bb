//! The `PageStore` trait: version rows, the page-number sequence, and the
//! catalog and live-page projections.
//!
//! The trait is implemented by storage backends (e.g. `vellum-store-sqlite`).
//! Each method is a single independent write or read; callers must not
//! assume that two calls are applied atomically together.

use std::future::Future;

use uuid::Uuid;

use crate::{
  PageNumber,
  catalog::{CatalogEntry, LivePage, ReservedSlug},
  page::{Document, Template},
};

/// Abstraction over a Vellum document store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait PageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Sequence ──────────────────────────────────────────────────────────

  /// Allocate the next page number. Must be atomic across all callers;
  /// never returns the same number twice.
  fn next_page_number(
    &self,
  ) -> impl Future<Output = Result<PageNumber, Self::Error>> + Send + '_;

  // ── Documents ─────────────────────────────────────────────────────────

  fn insert_document(
    &self,
    doc: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite the stored row with the same id.
  fn update_document(
    &self,
    doc: Document,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// All versions of a page ordered by version number.
  fn versions(
    &self,
    page: PageNumber,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  fn latest_version(
    &self,
    page: PageNumber,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Every page number that has at least one stored version.
  fn page_numbers(
    &self,
  ) -> impl Future<Output = Result<Vec<PageNumber>, Self::Error>> + Send + '_;

  fn count_documents(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Physically remove every version of a page. Returns the number of rows
  /// removed.
  fn delete_page_documents(
    &self,
    page: PageNumber,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Whether a non-deleted, non-redirect document outside `exclude` uses
  /// `slug`.
  fn slug_in_use<'a>(
    &'a self,
    slug: &'a str,
    exclude: Option<PageNumber>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Case-insensitive title check with the same scope as
  /// [`PageStore::slug_in_use`].
  fn title_in_use<'a>(
    &'a self,
    title: &'a str,
    exclude: Option<PageNumber>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Non-deleted, non-redirect documents strictly below `slug` in the path
  /// hierarchy, honouring segment boundaries.
  fn descendants<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// Redirect stubs whose source slug or target equals `slug`.
  fn redirects_involving<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  // ── Reserved paths and templates ──────────────────────────────────────

  fn reserved_slugs(
    &self,
  ) -> impl Future<Output = Result<Vec<ReservedSlug>, Self::Error>> + Send + '_;

  fn add_reserved_slug(
    &self,
    reserved: ReservedSlug,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` when no such path exists.
  fn remove_reserved_slug<'a>(
    &'a self,
    path: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn get_template(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Template>, Self::Error>> + Send + '_;

  fn add_template(
    &self,
    template: Template,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  fn get_catalog_entry(
    &self,
    page: PageNumber,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + '_;

  /// Delete any existing entry for the page and insert `entry`.
  fn replace_catalog_entry(
    &self,
    entry: CatalogEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_catalog_entry(
    &self,
    page: PageNumber,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_catalog(
    &self,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  // ── Live pages ────────────────────────────────────────────────────────

  fn live_pages(
    &self,
    page: PageNumber,
  ) -> impl Future<Output = Result<Vec<LivePage>, Self::Error>> + Send + '_;

  fn live_pages_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Vec<LivePage>, Self::Error>> + Send + 'a;

  /// Every page number that owns at least one live row.
  fn live_page_numbers(
    &self,
  ) -> impl Future<Output = Result<Vec<PageNumber>, Self::Error>> + Send + '_;

  fn insert_live_page(
    &self,
    page: LivePage,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove live rows for a page. Redirect rows are kept unless
  /// `include_redirects` is set.
  fn delete_live_pages(
    &self,
    page: PageNumber,
    include_redirects: bool,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Deferred cache purges ─────────────────────────────────────────────

  /// Record paths whose cache purge failed so it can be retried later.
  fn enqueue_purge(
    &self,
    paths: Vec<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Remove and return every queued path.
  fn take_pending_purges(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}
