//! Per-page mutual exclusion.
//!
//! Saves and publishes on the same page race on version allocation and on
//! the expiration chain, so every mutating operation holds the page's lock
//! for its whole duration. Locks for different pages are independent.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use vellum_core::PageNumber;

/// Key used to serialise page creation, which has no page number yet.
/// Allocated page numbers start at 1.
pub const CREATE_KEY: PageNumber = 0;

#[derive(Debug, Default)]
pub struct PageLocks {
  inner: Mutex<HashMap<PageNumber, Arc<AsyncMutex<()>>>>,
}

impl PageLocks {
  /// Wait for exclusive access to `page`. The lock is released when the
  /// guard drops.
  pub async fn lock(&self, page: PageNumber) -> OwnedMutexGuard<()> {
    let lock = {
      let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
      map.retain(|_, lock| Arc::strong_count(lock) > 1);
      map.entry(page).or_default().clone()
    };
    lock.lock_owned().await
  }

  /// Number of pages with a held or awaited lock.
  pub fn active(&self) -> usize {
    let map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
    map.values().filter(|lock| Arc::strong_count(lock) > 1).count()
  }
}
