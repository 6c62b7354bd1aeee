//! Workflow telemetry. Every step reports through `record_event`; the
//! backend is picked once from configuration.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::AppConfig;

#[async_trait]
pub trait Telemetry: Send + Sync {
    /// Record a named event. Failures are logged, never returned.
    async fn record_event(&self, name: &str, metadata: Value);
}

/// Emits events as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

#[async_trait]
impl Telemetry for TracingTelemetry {
    async fn record_event(&self, name: &str, metadata: Value) {
        tracing::info!(event = name, metadata = %metadata, "telemetry");
    }
}

/// Sends events to the Langfuse ingestion API.
pub struct Langfuse {
    client: reqwest::Client,
    host: String,
    public_key: String,
    secret_key: String,
}

impl Langfuse {
    pub fn new(host: &str, public_key: &str, secret_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: host.trim_end_matches('/').to_string(),
            public_key: public_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    fn batch(name: &str, metadata: Value) -> Value {
        let timestamp = Utc::now().to_rfc3339();
        json!({
            "batch": [{
                "id": Uuid::new_v4().to_string(),
                "timestamp": timestamp,
                "type": "event-create",
                "body": {
                    "id": Uuid::new_v4().to_string(),
                    "name": name,
                    "startTime": timestamp,
                    "metadata": metadata,
                }
            }]
        })
    }
}

#[async_trait]
impl Telemetry for Langfuse {
    async fn record_event(&self, name: &str, metadata: Value) {
        let result = self
            .client
            .post(format!("{}/api/public/ingestion", self.host))
            .basic_auth(&self.public_key, Some(&self.secret_key))
            .json(&Self::batch(name, metadata))
            .send()
            .await;

        match result {
            Ok(res) if res.status().is_success() => {
                tracing::debug!("Sent {} to Langfuse", name);
            }
            Ok(res) => tracing::warn!("Langfuse rejected {}: {}", name, res.status()),
            Err(e) => tracing::warn!("Failed to send {} to Langfuse: {}", name, e),
        }
    }
}

/// Langfuse when both keys are configured, log lines otherwise.
pub fn from_config(config: &AppConfig) -> Arc<dyn Telemetry> {
    match (&config.langfuse_public_key, &config.langfuse_secret_key) {
        (Some(public_key), Some(secret_key)) => {
            Arc::new(Langfuse::new(&config.langfuse_host, public_key, secret_key))
        }
        _ => {
            tracing::warn!("Langfuse credentials not found, telemetry goes to logs only");
            Arc::new(TracingTelemetry)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_langfuse_ingestion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/public/ingestion")
            .match_header("authorization", Matcher::Regex(String::from("^Basic ")))
            .match_body(Matcher::PartialJson(json!({
                "batch": [{"type": "event-create", "body": {"name": "calendar_agent"}}]
            })))
            .with_status(207)
            .with_body(r#"{"successes": [], "errors": []}"#)
            .create();

        let langfuse = Langfuse::new(&server.url(), "pk-lf", "sk-lf");
        langfuse
            .record_event("calendar_agent", json!({"slot": "2025-04-24T12:00:00Z"}))
            .await;

        mock.assert();
    }

    #[tokio::test]
    async fn test_langfuse_failures_are_swallowed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/public/ingestion")
            .with_status(500)
            .create();

        let langfuse = Langfuse::new(&server.url(), "pk-lf", "sk-lf");
        langfuse.record_event("inbox_agent", json!({})).await;
    }

    #[test]
    fn test_from_config_without_keys_uses_tracing() {
        let config = AppConfig {
            langfuse_public_key: None,
            langfuse_secret_key: None,
            ..AppConfig::default()
        };
        // Only checks construction does not panic without credentials
        let _telemetry = from_config(&config);
    }
}
