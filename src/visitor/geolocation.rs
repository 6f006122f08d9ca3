//! Geolocation providers
//!
//! A [`GeoLookup`] turns an IP string into [`GeoDetails`]. Providers report
//! every failure as a [`GeoError`]; callers decide whether that matters. For
//! visitor logging it never does, see `VisitorService::enrich`.

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::visitor::models::GeoDetails;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("geolocation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geolocation service returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("geolocation lookup failed: {0}")]
    Lookup(String),
    #[error("not a valid IP address: {0}")]
    InvalidIp(String),
    #[error("no geolocation data for {0}")]
    NotFound(String),
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Short provider name recorded on enriched visitor records
    fn provider(&self) -> &'static str;

    async fn lookup(&self, ip: &str) -> Result<GeoDetails, GeoError>;
}

/// Per-IP cache in front of another provider
///
/// Only successful lookups are cached, so a failing provider is retried on the
/// next request for the same address.
pub struct CachedGeoLookup {
    inner: Arc<dyn GeoLookup>,
    cache: Cache<String, GeoDetails>,
}

impl CachedGeoLookup {
    pub fn new(inner: Arc<dyn GeoLookup>, max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl GeoLookup for CachedGeoLookup {
    fn provider(&self) -> &'static str {
        self.inner.provider()
    }

    async fn lookup(&self, ip: &str) -> Result<GeoDetails, GeoError> {
        if let Some(details) = self.cache.get(ip).await {
            debug!(ip = %ip, "geolocation cache hit");
            return Ok(details);
        }

        let details = self.inner.lookup(ip).await?;
        self.cache.insert(ip.to_string(), details.clone()).await;
        Ok(details)
    }
}
