use axum::http::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Config, GeoProvider};
use crate::visitor::geoip::MaxMindLookup;
use crate::visitor::geolocation::{CachedGeoLookup, GeoLookup};
use crate::visitor::ip_api::IpApiClient;
use crate::visitor::ip_extractor::{resolve_client_ip, should_skip_enrichment};
use crate::visitor::logger::VisitorLogger;
use crate::visitor::models::{GeoDetails, VisitorRecord};
use crate::visitor::platform::PlatformHeaders;
use crate::visitor::sink::{HttpForwardSink, TracingSink};

/// Resolves, optionally enriches, and logs one visitor per request
#[derive(Clone)]
pub struct VisitorService {
    geo: Option<Arc<dyn GeoLookup>>,
    logger: VisitorLogger,
}

impl VisitorService {
    /// Service without enrichment
    pub fn new(logger: VisitorLogger) -> Self {
        Self { geo: None, logger }
    }

    pub fn with_geo(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.geo.is_some()
    }

    /// Build the base record from request headers
    pub fn resolve(&self, headers: &HeaderMap) -> VisitorRecord {
        VisitorRecord::new(
            resolve_client_ip(headers),
            PlatformHeaders::from_headers(headers),
        )
    }

    /// Look up geolocation for an address, treating every failure as "no data"
    pub async fn enrich(&self, ip: &str) -> Option<GeoDetails> {
        let geo = self.geo.as_ref()?;

        if should_skip_enrichment(ip) {
            debug!(ip = %ip, "Skipping geolocation for local or unknown address");
            return None;
        }

        match geo.lookup(ip).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!(ip = %ip, provider = geo.provider(), error = %e, "Geolocation lookup failed");
                None
            }
        }
    }

    /// Enrich a record in place, then log it
    pub async fn complete(&self, mut record: VisitorRecord) -> VisitorRecord {
        if let Some(details) = self.enrich(&record.ip).await {
            record.apply_geo(details);
        }

        self.logger.log(&record).await;
        record
    }

    /// Resolve, enrich, and log the visitor behind a request
    pub async fn observe(&self, headers: &HeaderMap, method: &str, url: &str) -> VisitorRecord {
        let record = VisitorRecord::from_request(
            resolve_client_ip(headers),
            PlatformHeaders::from_headers(headers),
            method,
            url,
        );
        self.complete(record).await
    }

    /// Wire providers and sinks from configuration
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut logger = VisitorLogger::new(Arc::new(TracingSink));
        if let Some(forward) = &config.forward {
            logger = logger.with_forwarder(Arc::new(HttpForwardSink::from_config(forward)?));
        }

        let service = Self::new(logger);
        if !config.visitor.enrichment {
            return Ok(service);
        }

        let geo: Arc<dyn GeoLookup> = match config.geo.provider {
            GeoProvider::IpApi => Arc::new(IpApiClient::from_config(&config.geo)?),
            GeoProvider::MaxMind => Arc::new(MaxMindLookup::new(
                config.geo.city_db_path.as_deref(),
                config.geo.asn_db_path.as_deref(),
            )?),
        };

        let geo: Arc<dyn GeoLookup> = if config.geo.cache_ttl_secs > 0 {
            Arc::new(CachedGeoLookup::new(
                geo,
                config.geo.cache_max_entries,
                Duration::from_secs(config.geo.cache_ttl_secs),
            ))
        } else {
            geo
        };

        Ok(service.with_geo(geo))
    }
}
