//! [`CachePurger`] posting path lists to a CDN purge endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use vellum_core::collab::{BoxError, CachePurger, PurgeOutcome};

use crate::PurgeConfig;

#[derive(Serialize)]
struct PurgeRequest<'a> {
  paths: &'a [String],
}

/// Response body of the purge endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurgeResponse {
  #[serde(default = "default_success")]
  success:           bool,
  #[serde(default)]
  message:           String,
  #[serde(default)]
  estimated_seconds: Option<u64>,
}

fn default_success() -> bool { true }

impl From<PurgeResponse> for PurgeOutcome {
  fn from(r: PurgeResponse) -> Self {
    Self {
      success:              r.success,
      message:              r.message,
      estimated_flush_secs: r.estimated_seconds,
    }
  }
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpPurger {
  client: Client,
  config: PurgeConfig,
}

impl HttpPurger {
  pub fn new(config: PurgeConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs.max(1)))
      .build()
      .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
    Ok(Self { client, config })
  }
}

impl CachePurger for HttpPurger {
  async fn purge(&self, paths: Vec<String>) -> Result<PurgeOutcome, BoxError> {
    let Some(endpoint) = self.config.endpoint.as_deref() else {
      tracing::info!(?paths, "no purge endpoint configured; skipping");
      return Ok(PurgeOutcome {
        success:              true,
        message:              "purge disabled".to_owned(),
        estimated_flush_secs: None,
      });
    };

    let mut req = self
      .client
      .post(endpoint)
      .json(&PurgeRequest { paths: &paths });
    if let Some(key) = &self.config.api_key {
      req = req.bearer_auth(key);
    }

    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(format!("POST {endpoint} → {status}: {body}").into());
    }

    let outcome: PurgeOutcome = resp.json::<PurgeResponse>().await?.into();
    tracing::debug!(paths = paths.len(), eta = ?outcome.estimated_flush_secs, "purge sent");
    Ok(outcome)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn response_defaults_to_success() {
    let r: PurgeResponse = serde_json::from_str(r#"{"estimatedSeconds": 12}"#).unwrap();
    let outcome = PurgeOutcome::from(r);
    assert!(outcome.success);
    assert_eq!(outcome.estimated_flush_secs, Some(12));
  }

  #[test]
  fn response_reports_failure() {
    let r: PurgeResponse =
      serde_json::from_str(r#"{"success": false, "message": "zone locked"}"#).unwrap();
    let outcome = PurgeOutcome::from(r);
    assert!(!outcome.success);
    assert_eq!(outcome.message, "zone locked");
  }

  #[tokio::test]
  async fn missing_endpoint_is_a_logged_no_op() {
    let purger = HttpPurger::new(PurgeConfig::default()).unwrap();
    let outcome = purger.purge(vec!["/about".into()]).await.unwrap();
    assert!(outcome.success);
  }
}
