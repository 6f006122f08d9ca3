use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::visitor::{should_skip_enrichment, VisitorRecord, VisitorService};

pub struct AppState {
    pub service: VisitorService,
}

/// Body sent by the client-side page tracker
#[derive(Debug, Default, Deserialize)]
pub struct VisitorLogRequest {
    /// Path of the page being viewed
    pub page: Option<String>,
    /// Client clock at page load
    pub timestamp: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitorLogResponse {
    pub success: bool,
    pub message: String,
    pub visitor: VisitorRecord,
}

/// Log the calling visitor and echo the record back
///
/// Always answers 200; `success` only says whether geolocation data was found.
pub async fn log_visitor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<VisitorLogResponse> {
    // A missing or malformed body only costs us the page path
    let payload: VisitorLogRequest = serde_json::from_slice(&body).unwrap_or_default();

    let mut record = state.service.resolve(&headers);
    record.method = Some(Method::POST.to_string());
    record.url = payload.page;
    if let Some(ref client_time) = payload.timestamp {
        tracing::debug!(ip = %record.ip, client_time = %client_time, "Tracker reported page load");
    }

    let skipped = should_skip_enrichment(&record.ip);
    let record = state.service.complete(record).await;

    let (success, message) = if record.is_enriched() {
        (true, "Visitor logged successfully")
    } else if !state.service.enrichment_enabled() {
        (false, "Geolocation disabled")
    } else if skipped {
        (false, "Localhost detected, skipping geolocation")
    } else {
        (false, "Geolocation unavailable")
    };

    Json(VisitorLogResponse {
        success,
        message: message.to_string(),
        visitor: record,
    })
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
