//! Error types for `vellum-core`.

use thiserror::Error;

use crate::PageNumber;

#[derive(Debug, Error)]
pub enum Error {
  /// The title or slug collides with a reserved path or another page.
  #[error("slug conflict: {0}")]
  SlugConflict(String),

  #[error("page {0} not found")]
  PageNotFound(PageNumber),

  #[error("document {0} not found")]
  DocumentNotFound(uuid::Uuid),

  #[error("template {0} not found")]
  TemplateNotFound(uuid::Uuid),

  /// The operation is never allowed on this page (e.g. trashing the home
  /// page). Callers must not retry.
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("invalid title: {0:?}")]
  InvalidTitle(String),

  #[error("unknown status code: {0}")]
  UnknownStatus(i64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Whether this is a not-found condition of any kind.
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::PageNotFound(_) | Self::DocumentNotFound(_) | Self::TemplateNotFound(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
