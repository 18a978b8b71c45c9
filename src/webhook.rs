use crate::{WebhookConfig, settings::SettingsStore};
use chrono::Local;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const BODY_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook URL is empty")]
    EmptyUrl,

    #[error("Webhook call failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct PingPayload<'a> {
    source: &'a str,
    time: String,
    message: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    pub status: u16,
    pub body: String,
}

/// Fire-and-forget notifier for the optional webhook URL in the settings.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    source: String,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build webhook client, using defaults: {}", e);
                reqwest::Client::new()
            });

        Self {
            client,
            source: config.source.clone(),
        }
    }

    pub async fn ping(&self, url: &str, message: &str) -> Result<PingResponse, WebhookError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(WebhookError::EmptyUrl);
        }

        let payload = PingPayload {
            source: &self.source,
            time: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            message,
        };

        let response = self.client.post(url).json(&payload).send().await?;
        let status = response.status().as_u16();
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(BODY_PREVIEW_CHARS)
            .collect();

        info!(status, "Webhook responded to '{}'", message);
        Ok(PingResponse { status, body })
    }
}

fn auto_ping_due(interval_minutes: u32, since_last: Duration) -> bool {
    interval_minutes > 0 && since_last >= Duration::from_secs(u64::from(interval_minutes) * 60)
}

/// Background pinger driven by the persisted settings. Re-reads the settings
/// file on every check so saved changes apply without a restart.
pub fn start_auto_ping(
    webhook: WebhookClient,
    settings_store: Arc<SettingsStore>,
    check_every: Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(check_every);
        interval.tick().await; // Skip the first immediate tick
        let mut last_ping = Instant::now();

        loop {
            interval.tick().await;

            let settings = settings_store.load();
            let Some(url) = settings.webhook_url() else {
                continue;
            };
            if !auto_ping_due(settings.auto_ping_interval, last_ping.elapsed()) {
                continue;
            }

            debug!("Sending scheduled webhook ping");
            last_ping = Instant::now();
            if let Err(e) = webhook.ping(url, "Auto ping").await {
                warn!("Scheduled webhook ping failed: {}", e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, routing::post};
    use tokio::sync::Mutex;

    fn test_client() -> WebhookClient {
        WebhookClient::new(&WebhookConfig {
            timeout_seconds: 2,
            source: "ARCHIPELAGO".to_string(),
        })
    }

    #[test]
    fn test_auto_ping_due() {
        assert!(!auto_ping_due(0, Duration::from_secs(10_000)));
        assert!(!auto_ping_due(5, Duration::from_secs(299)));
        assert!(auto_ping_due(5, Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn test_empty_url_is_rejected() {
        let result = test_client().ping("   ", "Manual ping").await;
        assert!(matches!(result, Err(WebhookError::EmptyUrl)));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_an_error() {
        let result = test_client()
            .ping("http://127.0.0.1:1/hook", "Manual ping")
            .await;
        assert!(matches!(result, Err(WebhookError::Request(_))));
    }

    #[tokio::test]
    async fn test_ping_posts_payload() {
        type Received = Arc<Mutex<Vec<serde_json::Value>>>;

        async fn hook(
            State(received): State<Received>,
            Json(body): Json<serde_json::Value>,
        ) -> &'static str {
            received.lock().await.push(body);
            "ok"
        }

        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/hook", post(hook))
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let response = test_client()
            .ping(&format!("http://{}/hook", addr), "Test ping")
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "ok");

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["source"], "ARCHIPELAGO");
        assert_eq!(received[0]["message"], "Test ping");
        assert!(received[0]["time"].as_str().is_some());
    }
}
