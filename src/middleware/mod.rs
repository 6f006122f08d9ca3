//! Per-request visitor logging middleware
//!
//! Runs in front of every page route. The request is passed through untouched;
//! the only visible effect is the optional set of `x-debug-*` response headers.
//! Without those headers the visitor is observed on a background task, so a slow
//! geolocation provider never delays the page.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Uri},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::config::VisitorConfig;
use crate::visitor::{VisitorRecord, VisitorService};

pub const X_DEBUG_IP: HeaderName = HeaderName::from_static("x-debug-ip");
pub const X_DEBUG_COUNTRY: HeaderName = HeaderName::from_static("x-debug-country");
pub const X_DEBUG_CITY: HeaderName = HeaderName::from_static("x-debug-city");
pub const X_DEBUG_MIDDLEWARE: HeaderName = HeaderName::from_static("x-debug-middleware");

/// Path prefixes that bypass visitor logging
#[derive(Debug, Clone, Default)]
pub struct PathExclusions {
    prefixes: Vec<String>,
}

impl PathExclusions {
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.trim_end_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// A path is excluded when it equals a prefix or lives underneath it
    pub fn is_excluded(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| {
            path == prefix.as_str()
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

pub struct VisitorMiddlewareState {
    pub service: VisitorService,
    pub exclusions: PathExclusions,
    pub debug_headers: bool,
}

impl VisitorMiddlewareState {
    pub fn new(service: VisitorService, config: &VisitorConfig) -> Self {
        Self {
            service,
            exclusions: PathExclusions::new(config.excluded_paths.iter().cloned()),
            debug_headers: config.debug_headers,
        }
    }
}

pub async fn visitor_middleware(
    State(state): State<Arc<VisitorMiddlewareState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.exclusions.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    let url = request_url(request.uri(), request.headers());

    if !state.debug_headers {
        // Nothing in the response depends on the record, so keep the lookup off the response path
        let service = state.service.clone();
        let headers = request.headers().clone();
        let method = request.method().to_string();
        tokio::spawn(async move {
            service.observe(&headers, &method, &url).await;
        });
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let record = state
        .service
        .observe(&parts.headers, parts.method.as_str(), &url)
        .await;
    let request = Request::from_parts(parts, body);

    let mut response = next.run(request).await;
    insert_debug_headers(&mut response, &record);
    response
}

/// Absolute URL of the request as the visitor addressed it
fn request_url(uri: &Uri, headers: &HeaderMap) -> String {
    if uri.scheme().is_some() {
        return uri.to_string();
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");

    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) => format!("{}://{}{}", scheme, host, uri),
        None => uri.to_string(),
    }
}

fn insert_debug_headers(response: &mut Response, record: &VisitorRecord) {
    let headers = response.headers_mut();

    if let Some(value) = debug_header_value(&record.ip) {
        headers.insert(X_DEBUG_IP, value);
    }
    if let Some(value) = debug_header_value(&record.country) {
        headers.insert(X_DEBUG_COUNTRY, value);
    }
    if let Some(value) = debug_header_value(&record.city) {
        headers.insert(X_DEBUG_CITY, value);
    }
    headers.insert(X_DEBUG_MIDDLEWARE, HeaderValue::from_static("executed"));
}

/// Plain ASCII goes out as-is; anything else is percent-encoded
fn debug_header_value(value: &str) -> Option<HeaderValue> {
    if value.is_ascii() {
        if let Ok(header) = HeaderValue::from_str(value) {
            return Some(header);
        }
    }
    HeaderValue::from_str(&urlencoding::encode(value)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_default_exclusions() {
        let exclusions = PathExclusions::new(VisitorConfig::default_excluded_paths());

        assert!(exclusions.is_excluded("/api"));
        assert!(exclusions.is_excluded("/api/visitor-log"));
        assert!(exclusions.is_excluded("/_next/static/chunks/main.js"));
        assert!(exclusions.is_excluded("/_next/image"));
        assert!(exclusions.is_excluded("/favicon.ico"));

        assert!(!exclusions.is_excluded("/"));
        assert!(!exclusions.is_excluded("/home"));
        assert!(!exclusions.is_excluded("/apiary"));
        assert!(!exclusions.is_excluded("/products/forceps"));
    }

    #[test]
    fn test_trailing_slash_prefixes() {
        let exclusions = PathExclusions::new(vec!["/assets/".to_string(), "/".to_string()]);

        assert!(exclusions.is_excluded("/assets/logo.svg"));
        // "/" collapses to an empty prefix and is dropped
        assert!(!exclusions.is_excluded("/about"));
    }

    #[test]
    fn test_request_url_uses_host_header() {
        let request = HttpRequest::builder()
            .uri("/products?ref=nav")
            .header(header::HOST, "sjksurgical.com")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();

        assert_eq!(
            request_url(request.uri(), request.headers()),
            "https://sjksurgical.com/products?ref=nav"
        );
    }

    #[test]
    fn test_debug_header_value_encodes_only_when_needed() {
        assert_eq!(debug_header_value("United States").unwrap(), "United States");
        assert_eq!(debug_header_value("São Paulo").unwrap(), "S%C3%A3o%20Paulo");
        assert_eq!(debug_header_value("line\nbreak").unwrap(), "line%0Abreak");
    }

    #[test]
    fn test_request_url_without_host() {
        let request = HttpRequest::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(request_url(request.uri(), request.headers()), "/");
    }
}
