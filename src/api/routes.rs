use axum::{
    http::Uri,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{SiteConfig, VisitorConfig};
use crate::middleware::{visitor_middleware, VisitorMiddlewareState};
use crate::visitor::VisitorService;

use super::handlers::{health_check, log_visitor, AppState};
use super::static_files::serve_static;

/// Site router: API routes, site pages, and the visitor logging layer
pub fn create_router(service: VisitorService, visitor: &VisitorConfig, site: &SiteConfig) -> Router {
    let state = Arc::new(AppState {
        service: service.clone(),
    });
    let static_dir = site.static_dir.clone();

    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/visitor-log", post(log_visitor))
        .with_state(state)
        .fallback(move |uri: Uri| serve_static(uri, static_dir.clone()));

    let router = if visitor.enabled {
        let middleware_state = Arc::new(VisitorMiddlewareState::new(service, visitor));
        router.layer(middleware::from_fn_with_state(
            middleware_state,
            visitor_middleware,
        ))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}
