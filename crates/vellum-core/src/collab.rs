//! Contracts for the external collaborators the engine drives.
//!
//! Failures from these calls are infrastructure-class: the engine logs them
//! and carries on, so every method reports errors as a boxed [`BoxError`].

use std::future::Future;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// ─── Cache invalidation ──────────────────────────────────────────────────────

/// Result of a purge request as reported by the CDN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeOutcome {
  pub success:              bool,
  pub message:              String,
  /// Seconds until the purge is expected to have propagated.
  pub estimated_flush_secs: Option<u64>,
}

pub trait CachePurger: Send + Sync {
  fn purge(
    &self,
    paths: Vec<String>,
  ) -> impl Future<Output = Result<PurgeOutcome, BoxError>> + Send + '_;
}

// ─── Static export ───────────────────────────────────────────────────────────

/// Renders a route template (`"page"`, `"redirect"`) with a JSON view model.
pub trait SiteRenderer: Send + Sync {
  fn render<'a>(
    &'a self,
    route: &'a str,
    model: &'a serde_json::Value,
  ) -> impl Future<Output = Result<String, BoxError>> + Send + 'a;
}

/// Blob storage used for exported HTML, the sitemap and the robots file.
pub trait BlobStore: Send + Sync {
  fn write(
    &self,
    path: String,
    bytes: Bytes,
    content_type: String,
  ) -> impl Future<Output = Result<(), BoxError>> + Send + '_;

  /// Deleting a missing path is not an error.
  fn delete(
    &self,
    path: String,
  ) -> impl Future<Output = Result<(), BoxError>> + Send + '_;
}

// ─── Content ─────────────────────────────────────────────────────────────────

/// Normalises editor HTML: every editable region gets a stable unique id and
/// editor-only markup is stripped. Must be idempotent.
pub trait Sanitizer: Send + Sync {
  fn normalize(&self, html: &str) -> Result<String, BoxError>;
}

// ─── Notifications and identity ──────────────────────────────────────────────

/// Fire-and-forget push channel for live-collaboration updates.
pub trait Notifier: Send + Sync {
  fn broadcast(&self, event: &str, payload: serde_json::Value);
}

/// Read-only principal lookup.
pub trait Directory: Send + Sync {
  fn display_name<'a>(
    &'a self,
    principal_id: &'a str,
  ) -> impl Future<Output = Result<Option<String>, BoxError>> + Send + 'a;
}

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// The full set of collaborators handed to the engine.
pub trait Collaborators: Send + Sync {
  type Purger: CachePurger;
  type Renderer: SiteRenderer;
  type Blobs: BlobStore;
  type Sanitizer: Sanitizer;
  type Notifier: Notifier;
  type Directory: Directory;

  fn purger(&self) -> &Self::Purger;
  fn renderer(&self) -> &Self::Renderer;
  fn blobs(&self) -> &Self::Blobs;
  fn sanitizer(&self) -> &Self::Sanitizer;
  fn notifier(&self) -> &Self::Notifier;
  fn directory(&self) -> &Self::Directory;
}

/// A plain struct implementing [`Collaborators`] from its fields.
#[derive(Debug, Clone)]
pub struct Services<P, R, B, S, N, D> {
  pub purger:    P,
  pub renderer:  R,
  pub blobs:     B,
  pub sanitizer: S,
  pub notifier:  N,
  pub directory: D,
}

impl<P, R, B, S, N, D> Collaborators for Services<P, R, B, S, N, D>
where
  P: CachePurger,
  R: SiteRenderer,
  B: BlobStore,
  S: Sanitizer,
  N: Notifier,
  D: Directory,
{
  type Purger = P;
  type Renderer = R;
  type Blobs = B;
  type Sanitizer = S;
  type Notifier = N;
  type Directory = D;

  fn purger(&self) -> &P { &self.purger }
  fn renderer(&self) -> &R { &self.renderer }
  fn blobs(&self) -> &B { &self.blobs }
  fn sanitizer(&self) -> &S { &self.sanitizer }
  fn notifier(&self) -> &N { &self.notifier }
  fn directory(&self) -> &D { &self.directory }
}
