//! Error type for `vellum-engine`.

use thiserror::Error;

/// An error returned by an engine operation.
///
/// Validation-class failures (slug conflicts, missing pages, forbidden
/// operations) arrive as [`Error::Core`]. Collaborator failures never
/// surface here; they are logged and left to the reconciliation sweep.
#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] vellum_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// Whether the failure should be reported to the end user rather than
  /// treated as an infrastructure fault.
  pub fn is_user_visible(&self) -> bool { matches!(self, Self::Core(_)) }

  pub fn is_forbidden(&self) -> bool {
    matches!(self, Self::Core(vellum_core::Error::Forbidden(_)))
  }

  pub fn is_slug_conflict(&self) -> bool {
    matches!(self, Self::Core(vellum_core::Error::SlugConflict(_)))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::Core(e) if e.is_not_found())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
