//! Destinations for visitor records

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use crate::config::ForwardConfig;
use crate::visitor::models::VisitorRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("delivery failed: {0}")]
    Delivery(#[from] reqwest::Error),
    #[error("analytics endpoint returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Anything that accepts visitor records: log output, an analytics service, a database
#[async_trait]
pub trait VisitorSink: Send + Sync {
    async fn record(&self, record: &VisitorRecord) -> Result<(), SinkError>;
}

/// Emits one structured `tracing` event per record
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

#[async_trait]
impl VisitorSink for TracingSink {
    async fn record(&self, record: &VisitorRecord) -> Result<(), SinkError> {
        let json = serde_json::to_string(record).context("failed to serialize visitor record")?;

        info!(
            target: "visitor",
            ip = %record.ip,
            country = %record.country,
            city = %record.city,
            user_agent = %record.user_agent,
            url = record.url.as_deref().unwrap_or(""),
            enriched = record.is_enriched(),
            record = %json,
            "Visitor"
        );

        Ok(())
    }
}

/// POSTs records to the internal analytics endpoint with a bearer token
#[derive(Clone)]
pub struct HttpForwardSink {
    client: Client,
    endpoint: String,
    secret: String,
}

impl HttpForwardSink {
    pub fn from_config(config: &ForwardConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("visitor-log/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client for analytics forwarding")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            secret: config.secret.clone(),
        })
    }
}

#[async_trait]
impl VisitorSink for HttpForwardSink {
    async fn record(&self, record: &VisitorRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.secret)
            .json(record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status));
        }

        Ok(())
    }
}
