//! Results sink client.
//!
//! Finished sessions are posted as a single urlencoded form field named
//! `payload` whose value is the JSON text of the result. Delivery is best
//! effort: in fire-and-forget mode the response is never inspected.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use kobun_core::{ResultPayload, SinkMode};

/// Sink errors.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink url not configured")]
    NotConfigured,

    #[error("network error: {0}")]
    Network(String),

    #[error("rejected by sink: {status} {message}")]
    Rejected { status: u16, message: String },

    #[error("could not encode payload: {0}")]
    Serialize(String),

    #[error("could not build http client: {0}")]
    Client(String),
}

/// Destination for finished-session results.
#[async_trait]
pub trait ResultsSink: Send + Sync {
    /// Deliver one payload. Errors are reported to the learner, never retried.
    async fn deliver(&self, payload: &ResultPayload) -> Result<(), SinkError>;
}

/// Sink posting to a remote spreadsheet endpoint over HTTP.
pub struct HttpSink {
    client: Client,
    url: Option<String>,
    mode: SinkMode,
}

impl HttpSink {
    /// A request that takes longer than `timeout` fails as a network error.
    pub fn new(
        url: Option<String>,
        mode: SinkMode,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Client(e.to_string()))?;
        Ok(Self { client, url, mode })
    }
}

#[async_trait]
impl ResultsSink for HttpSink {
    async fn deliver(&self, payload: &ResultPayload) -> Result<(), SinkError> {
        let url = self.url.as_deref().ok_or(SinkError::NotConfigured)?;
        let json = payload
            .to_json()
            .map_err(|e| SinkError::Serialize(e.to_string()))?;

        let resp = self
            .client
            .post(url)
            .form(&[("payload", json)])
            .send()
            .await
            .map_err(|e| SinkError::Network(e.to_string()))?;

        match self.mode {
            SinkMode::FireAndForget => {
                tracing::info!(user = %payload.user_name, "results posted (response not inspected)");
                Ok(())
            }
            SinkMode::Confirmable => {
                if !resp.status().is_success() {
                    let status = resp.status().as_u16();
                    let message = resp.text().await.unwrap_or_default();
                    return Err(SinkError::Rejected { status, message });
                }
                tracing::info!(user = %payload.user_name, "results delivered");
                Ok(())
            }
        }
    }
}
