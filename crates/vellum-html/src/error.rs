//! Error types for the vellum-html toolkit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("malformed markup: {0}")]
  Parse(String),

  #[error("failed to write markup: {0}")]
  Write(String),

  #[error("unknown route template: {0:?}")]
  UnknownRoute(String),

  #[error("view model missing field {0:?}")]
  MissingField(&'static str),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
