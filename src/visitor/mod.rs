//! Visitor IP and geolocation logging
//!
//! Every page request is turned into a [`VisitorRecord`]: the client IP is
//! resolved from proxy headers, optionally enriched through a [`GeoLookup`]
//! provider, and handed to a [`VisitorSink`]. None of this can fail the request.

pub mod geoip;
pub mod geolocation;
pub mod ip_api;
pub mod ip_extractor;
pub mod logger;
pub mod models;
pub mod platform;
pub mod service;
pub mod sink;

pub use geoip::MaxMindLookup;
pub use geolocation::{CachedGeoLookup, GeoError, GeoLookup};
pub use ip_api::IpApiClient;
pub use ip_extractor::{resolve_client_ip, should_skip_enrichment};
pub use logger::VisitorLogger;
pub use models::{GeoDetails, VisitorRecord, UNKNOWN, UNKNOWN_IP};
pub use platform::PlatformHeaders;
pub use service::VisitorService;
pub use sink::{HttpForwardSink, SinkError, TracingSink, VisitorSink};
