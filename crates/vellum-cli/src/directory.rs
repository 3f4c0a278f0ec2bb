//! Identity lookup and notification backends that need no external service.

use std::collections::HashMap;

use serde_json::Value;
use vellum_core::collab::{BoxError, Directory, Notifier};

/// Display names read from the `[directory]` config table.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
  names: HashMap<String, String>,
}

impl StaticDirectory {
  pub fn new(names: HashMap<String, String>) -> Self { Self { names } }
}

impl Directory for StaticDirectory {
  async fn display_name(&self, principal_id: &str) -> Result<Option<String>, BoxError> {
    Ok(self.names.get(principal_id).cloned())
  }
}

/// Writes broadcasts to the log. There is no live-collaboration channel in
/// the command-line binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn broadcast(&self, event: &str, payload: Value) {
    tracing::info!(event, %payload, "broadcast");
  }
}
