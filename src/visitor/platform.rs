//! Headers injected by the hosting platform's edge network

use axum::http::{header, HeaderMap};

pub const COUNTRY_HEADER: &str = "x-vercel-ip-country";
pub const REGION_HEADER: &str = "x-vercel-ip-country-region";
pub const CITY_HEADER: &str = "x-vercel-ip-city";
pub const TIMEZONE_HEADER: &str = "x-vercel-ip-timezone";

/// Request attributes that come straight from headers, no lookups involved
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformHeaders {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub timezone: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl PlatformHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            country: header_value(headers, COUNTRY_HEADER),
            region: header_value(headers, REGION_HEADER),
            // The platform percent-encodes city names ("S%C3%A3o%20Paulo")
            city: header_value(headers, CITY_HEADER).map(|city| {
                urlencoding::decode(&city)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or(city)
            }),
            timezone: header_value(headers, TIMEZONE_HEADER),
            user_agent: header_value(headers, header::USER_AGENT.as_str()),
            referer: header_value(headers, header::REFERER.as_str()),
        }
    }
}

/// Read a header as a non-empty string
pub(crate) fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
