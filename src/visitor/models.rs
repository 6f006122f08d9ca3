//! Data models for visitor logging

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::visitor::platform::PlatformHeaders;

/// Placeholder IP used when no client address header is present
pub const UNKNOWN_IP: &str = "Unknown IP";

/// Placeholder for location and user-agent fields with no data
pub const UNKNOWN: &str = "Unknown";

/// Geographic details returned by a geolocation provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoDetails {
    /// Country name
    pub country: Option<String>,

    /// ISO country code (e.g., "US", "GB")
    pub country_code: Option<String>,

    /// Region/state/province name
    pub region: Option<String>,

    /// City name
    pub city: Option<String>,

    /// Postal or ZIP code
    pub postal: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// IANA time zone (e.g., "America/New_York")
    pub timezone: Option<String>,

    /// Internet service provider
    pub isp: Option<String>,

    /// Organization owning the address block
    pub org: Option<String>,

    /// Autonomous system, formatted by the provider (e.g., "AS15169 Google LLC")
    pub asn: Option<String>,

    /// Name of the provider that produced these details
    pub provider: String,
}

/// Everything known about one visitor request
///
/// Built fresh for every request, logged, then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorRecord {
    pub ip: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub region: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// RFC 3339 timestamp taken when the record was built
    pub timestamp: String,
}

impl VisitorRecord {
    /// Create a base record from a resolved IP and the platform-supplied headers
    pub fn new(ip: impl Into<String>, platform: PlatformHeaders) -> Self {
        Self {
            ip: ip.into(),
            country: platform.country.unwrap_or_else(|| UNKNOWN.to_string()),
            country_code: None,
            region: platform.region.unwrap_or_else(|| UNKNOWN.to_string()),
            city: platform.city.unwrap_or_else(|| UNKNOWN.to_string()),
            timezone: platform.timezone,
            latitude: None,
            longitude: None,
            isp: None,
            org: None,
            postal: None,
            provider: None,
            coordinates: None,
            google_maps_url: None,
            user_agent: platform.user_agent.unwrap_or_else(|| UNKNOWN.to_string()),
            referer: platform.referer,
            url: None,
            method: None,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Base record for a request the visitor made
    pub fn from_request(
        ip: impl Into<String>,
        platform: PlatformHeaders,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::new(ip, platform).with_request(method, url)
    }

    /// Attach the request line
    pub fn with_request(mut self, method: impl Into<String>, url: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.url = Some(url.into());
        self
    }

    /// Merge geolocation details into the record
    ///
    /// Provider values take precedence over platform header values.
    pub fn apply_geo(&mut self, geo: GeoDetails) {
        if let Some(country) = geo.country {
            self.country = country;
        }
        if let Some(region) = geo.region {
            self.region = region;
        }
        if let Some(city) = geo.city {
            self.city = city;
        }
        if geo.timezone.is_some() {
            self.timezone = geo.timezone;
        }

        self.country_code = geo.country_code;
        self.latitude = geo.latitude;
        self.longitude = geo.longitude;
        self.isp = geo.isp;
        self.org = geo.org;
        self.postal = geo.postal;
        self.provider = Some(geo.provider);

        if let (Some(lat), Some(lon)) = (self.latitude, self.longitude) {
            self.coordinates = Some(format!("{}, {}", lat, lon));
            self.google_maps_url = Some(format!("https://maps.google.com/maps?q={},{}", lat, lon));
        }
    }

    /// Whether a geolocation provider contributed to this record
    pub fn is_enriched(&self) -> bool {
        self.provider.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_uses_sentinels() {
        let record = VisitorRecord::new(UNKNOWN_IP, PlatformHeaders::default());

        assert_eq!(record.ip, "Unknown IP");
        assert_eq!(record.country, "Unknown");
        assert_eq!(record.region, "Unknown");
        assert_eq!(record.city, "Unknown");
        assert_eq!(record.user_agent, "Unknown");
        assert!(record.timezone.is_none());
        assert!(!record.is_enriched());
        assert!(record.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
    }

    #[test]
    fn test_from_request_carries_request_line() {
        let platform = PlatformHeaders {
            user_agent: Some("Mozilla/5.0".to_string()),
            ..PlatformHeaders::default()
        };
        let record = VisitorRecord::from_request("8.8.8.8", platform, "GET", "/catalog");

        assert_eq!(record.ip, "8.8.8.8");
        assert_eq!(record.user_agent, "Mozilla/5.0");
        assert_eq!(record.method.as_deref(), Some("GET"));
        assert_eq!(record.url.as_deref(), Some("/catalog"));
        assert_eq!(record.country, "Unknown");
    }

    #[test]
    fn test_unenriched_record_omits_geo_fields() {
        let record = VisitorRecord::new("203.0.113.7", PlatformHeaders::default())
            .with_request("GET", "http://localhost/products");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["ip"], "203.0.113.7");
        assert_eq!(json["userAgent"], "Unknown");
        assert_eq!(json["method"], "GET");
        assert_eq!(json["url"], "http://localhost/products");
        assert!(json.get("latitude").is_none());
        assert!(json.get("longitude").is_none());
        assert!(json.get("isp").is_none());
    }

    #[test]
    fn test_apply_geo_overrides_platform_values() {
        let platform = PlatformHeaders {
            country: Some("US".to_string()),
            city: Some("Boston".to_string()),
            ..Default::default()
        };
        let mut record = VisitorRecord::new("8.8.8.8", platform);

        record.apply_geo(GeoDetails {
            country: Some("United States".to_string()),
            country_code: Some("US".to_string()),
            city: Some("Mountain View".to_string()),
            latitude: Some(37.4056),
            longitude: Some(-122.0775),
            isp: Some("Google LLC".to_string()),
            provider: "ip-api.com".to_string(),
            ..Default::default()
        });

        assert_eq!(record.country, "United States");
        assert_eq!(record.city, "Mountain View");
        // Region was never supplied by either source
        assert_eq!(record.region, "Unknown");
        assert_eq!(record.coordinates.as_deref(), Some("37.4056, -122.0775"));
        assert_eq!(
            record.google_maps_url.as_deref(),
            Some("https://maps.google.com/maps?q=37.4056,-122.0775")
        );
        assert!(record.is_enriched());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["googleMapsUrl"], "https://maps.google.com/maps?q=37.4056,-122.0775");
        assert_eq!(json["countryCode"], "US");
    }
}
