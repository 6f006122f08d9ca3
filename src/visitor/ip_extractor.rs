//! Client IP extraction from HTTP headers
//!
//! Headers are consulted in a fixed trust order:
//! - `CF-Connecting-IP`, asserted by the CDN
//! - `X-Real-IP`, set by the fronting proxy
//! - the first hop of `X-Forwarded-For`, which the client can influence
//!
//! The result is a best-effort label for logs. It is spoofable and must never be
//! used as an authenticated identity.

use axum::http::HeaderMap;
use std::net::IpAddr;

use crate::visitor::models::UNKNOWN_IP;
use crate::visitor::platform::header_value;

pub const CF_CONNECTING_IP: &str = "cf-connecting-ip";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the client IP from request headers
///
/// Returns [`UNKNOWN_IP`] when none of the headers carry a value. The value is
/// returned as written; no address syntax validation happens here.
pub fn resolve_client_ip(headers: &HeaderMap) -> String {
    header_value(headers, CF_CONNECTING_IP)
        .or_else(|| header_value(headers, X_REAL_IP))
        .or_else(|| first_forwarded_for(headers))
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

/// First entry of the comma-separated X-Forwarded-For chain
fn first_forwarded_for(headers: &HeaderMap) -> Option<String> {
    let xff = header_value(headers, X_FORWARDED_FOR)?;

    xff.split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Whether geolocation should be skipped for this address
///
/// True for the unknown sentinel and for loopback addresses.
pub fn should_skip_enrichment(ip: &str) -> bool {
    if ip == UNKNOWN_IP || ip == "127.0.0.1" || ip == "::1" {
        return true;
    }

    ip.parse::<IpAddr>()
        .map(|addr| addr.is_loopback())
        .unwrap_or(false)
}
