//! [`BlobStore`] writing exported files below a directory on disk.

use std::{
  io,
  path::{Component, Path, PathBuf},
};

use bytes::Bytes;
use vellum_core::collab::{BlobStore, BoxError};

#[derive(Debug, Clone)]
pub struct FsBlobStore {
  root: PathBuf,
}

impl FsBlobStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  /// Map a blob path onto the filesystem, refusing anything that would
  /// escape the root.
  fn resolve(&self, path: &str) -> Result<PathBuf, BoxError> {
    let relative = Path::new(path.trim_start_matches('/'));
    if relative.as_os_str().is_empty()
      || relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
      return Err(format!("invalid blob path {path:?}").into());
    }
    Ok(self.root.join(relative))
  }
}

impl BlobStore for FsBlobStore {
  async fn write(&self, path: String, bytes: Bytes, content_type: String) -> Result<(), BoxError> {
    let target = self.resolve(&path)?;
    if let Some(parent) = target.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &bytes).await?;
    tracing::debug!(%path, %content_type, bytes = bytes.len(), "blob written");
    Ok(())
  }

  async fn delete(&self, path: String) -> Result<(), BoxError> {
    let target = self.resolve(&path)?;
    match tokio::fs::remove_file(&target).await {
      Ok(()) => {}
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
      Err(e) => return Err(e.into()),
    }
    tracing::debug!(%path, "blob deleted");

    // Drop the now-empty `{slug}/` directory left behind by an export.
    if let Some(parent) = target.parent()
      && parent != self.root.as_path()
    {
      match tokio::fs::remove_dir(parent).await {
        Ok(()) => tracing::debug!(dir = %parent.display(), "empty export directory removed"),
        Err(e)
          if matches!(
            e.kind(),
            io::ErrorKind::NotFound | io::ErrorKind::DirectoryNotEmpty
          ) => {}
        Err(e) => {
          tracing::debug!(dir = %parent.display(), error = %e, "failed to remove export directory");
        }
      }
    }
    Ok(())
  }
}
