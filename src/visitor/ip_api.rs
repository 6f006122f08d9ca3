//! ip-api.com JSON lookup client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::borrow::Cow;
use std::net::IpAddr;
use std::time::Duration;

use crate::config::GeoConfig;
use crate::visitor::geolocation::{GeoError, GeoLookup};
use crate::visitor::models::GeoDetails;

const FIELDS: &str =
    "status,message,country,countryCode,region,regionName,city,zip,lat,lon,timezone,isp,org,as,query";

pub const PROVIDER_NAME: &str = "ip-api.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    country: Option<String>,
    country_code: Option<String>,
    region_name: Option<String>,
    city: Option<String>,
    zip: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    timezone: Option<String>,
    isp: Option<String>,
    org: Option<String>,
    #[serde(rename = "as")]
    asn: Option<String>,
}

/// HTTP client for the ip-api.com JSON endpoint
#[derive(Clone)]
pub struct IpApiClient {
    client: Client,
    base_url: String,
}

impl IpApiClient {
    pub fn from_config(config: &GeoConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client for geolocation lookups")?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Addresses go into the path as written; anything else is percent-encoded
fn path_segment(ip: &str) -> Cow<'_, str> {
    if ip.parse::<IpAddr>().is_ok() {
        Cow::Borrowed(ip)
    } else {
        urlencoding::encode(ip)
    }
}

#[async_trait]
impl GeoLookup for IpApiClient {
    fn provider(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn lookup(&self, ip: &str) -> Result<GeoDetails, GeoError> {
        let url = format!("{}/{}?fields={}", self.base_url, path_segment(ip), FIELDS);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status));
        }

        let body: IpApiResponse = response.json().await?;
        if body.status == "fail" {
            return Err(GeoError::Lookup(
                body.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(GeoDetails {
            country: body.country,
            country_code: body.country_code,
            region: body.region_name,
            city: body.city,
            postal: body.zip,
            latitude: body.lat,
            longitude: body.lon,
            timezone: body.timezone,
            isp: body.isp,
            org: body.org,
            asn: body.asn,
            provider: PROVIDER_NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_success_body() {
        let body: IpApiResponse = serde_json::from_str(
            r#"{
                "status": "success",
                "country": "Pakistan",
                "countryCode": "PK",
                "region": "PB",
                "regionName": "Punjab",
                "city": "Sialkot",
                "zip": "51310",
                "lat": 32.4945,
                "lon": 74.5229,
                "timezone": "Asia/Karachi",
                "isp": "PTCL",
                "org": "PTCL",
                "as": "AS17557 Pakistan Telecommunication Company Limited",
                "query": "39.32.0.1"
            }"#,
        )
        .unwrap();

        assert_eq!(body.status, "success");
        assert_eq!(body.region_name.as_deref(), Some("Punjab"));
        assert_eq!(body.country_code.as_deref(), Some("PK"));
        assert_eq!(body.lat, Some(32.4945));
        assert!(body.asn.unwrap().starts_with("AS17557"));
    }

    #[test]
    fn test_parses_failure_body() {
        let body: IpApiResponse =
            serde_json::from_str(r#"{"status": "fail", "message": "invalid query"}"#).unwrap();

        assert_eq!(body.status, "fail");
        assert_eq!(body.message.as_deref(), Some("invalid query"));
        assert!(body.lat.is_none());
    }

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("8.8.8.8"), "8.8.8.8");
        assert_eq!(path_segment("2001:db8::1"), "2001:db8::1");
        assert_eq!(path_segment("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = GeoConfig {
            api_url: "http://ip-api.com/json/".to_string(),
            ..GeoConfig::default()
        };
        let client = IpApiClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "http://ip-api.com/json");
    }
}
