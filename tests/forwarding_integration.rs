//! Integration tests for forwarding visitor records to the analytics endpoint

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tower::ServiceExt;
use visitor_log::api::create_router;
use visitor_log::config::{ForwardConfig, SiteConfig, VisitorConfig};
use visitor_log::visitor::{
    HttpForwardSink, TracingSink, VisitorLogger, VisitorRecord, VisitorService,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_forwarding_app(endpoint: String) -> axum::Router {
    let forwarder = HttpForwardSink::from_config(&ForwardConfig {
        endpoint,
        secret: "test-secret".to_string(),
    })
    .unwrap();
    let logger = VisitorLogger::new(Arc::new(TracingSink)).with_forwarder(Arc::new(forwarder));

    create_router(
        VisitorService::new(logger),
        &VisitorConfig::default(),
        &SiteConfig { static_dir: None },
    )
}

/// Wait for the fire-and-forget delivery to land
async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<wiremock::Request> {
    for _ in 0..50 {
        let requests = server.received_requests().await.unwrap();
        if requests.len() >= count {
            return requests;
        }
        sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap()
}

#[tokio::test]
async fn test_records_are_forwarded_with_bearer_token() {
    let analytics = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/analytics"))
        .and(header("authorization", "Bearer test-secret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&analytics)
        .await;

    let app = create_forwarding_app(format!("{}/api/analytics", analytics.uri()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/about")
                .header("host", "sjksurgical.test")
                .header("cf-connecting-ip", "192.0.2.77")
                .header("x-vercel-ip-country", "DE")
                .header("x-vercel-ip-city", "M%C3%BCnchen")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let requests = wait_for_requests(&analytics, 1).await;
    assert_eq!(requests.len(), 1);

    let record: VisitorRecord = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(record.ip, "192.0.2.77");
    assert_eq!(record.country, "DE");
    assert_eq!(record.city, "München");
    assert_eq!(record.region, "Unknown");
    assert_eq!(record.url.as_deref(), Some("http://sjksurgical.test/about"));
}

#[tokio::test]
async fn test_delivery_failure_does_not_affect_response() {
    let analytics = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&analytics)
        .await;

    let app = create_forwarding_app(format!("{}/api/analytics", analytics.uri()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-real-ip", "192.0.2.78")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    // Delivered once, never retried
    sleep(Duration::from_millis(200)).await;
    assert_eq!(analytics.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unreachable_endpoint_does_not_affect_response() {
    let app = create_forwarding_app("http://127.0.0.1:9/api/analytics".to_string());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-real-ip", "192.0.2.79")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
