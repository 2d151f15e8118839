//! Axum router construction.
//!
//! Assembles the REST routes, the `WebSocket` feed, and the middleware
//! stack into a single [`Router`]. The incident and analytics routes sit
//! behind the per-client rate limit; the health probe and the
//! `WebSocket` upgrade sit in front of it, so load balancer checks and
//! long-lived feed connections never spend request budget.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, limit, ws};

/// Build the complete Axum router with the live feed mounted.
pub fn build_router(state: Arc<AppState>) -> Router {
    build_router_with_live_feed(state, true)
}

/// Build the Axum router, optionally without the `/ws` endpoint.
///
/// CORS allows any origin; the API is public and fronted by the
/// festival's edge proxy.
pub fn build_router_with_live_feed(state: Arc<AppState>, live_feed: bool) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let limited = Router::new()
        // Crowd reports
        .route(
            "/api/crowd-reports",
            get(handlers::list_crowd_reports).post(handlers::create_crowd_report),
        )
        .route(
            "/api/crowd-reports/nearby",
            get(handlers::nearby_crowd_reports),
        )
        .route(
            "/api/crowd-reports/{id}",
            get(handlers::get_crowd_report)
                .put(handlers::update_crowd_report)
                .delete(handlers::delete_crowd_report),
        )
        .route(
            "/api/crowd-reports/{id}/upvote",
            post(handlers::upvote_crowd_report),
        )
        .route(
            "/api/crowd-reports/{id}/resolve",
            post(handlers::resolve_crowd_report),
        )
        // SOS requests
        .route(
            "/api/sos-requests",
            get(handlers::list_sos_requests).post(handlers::create_sos_request),
        )
        .route("/api/sos-requests/nearby", get(handlers::nearby_sos_requests))
        .route(
            "/api/sos-requests/{id}",
            get(handlers::get_sos_request)
                .put(handlers::update_sos_request)
                .delete(handlers::delete_sos_request),
        )
        .route(
            "/api/sos-requests/{id}/respond",
            post(handlers::respond_sos_request),
        )
        .route(
            "/api/sos-requests/{id}/resolve",
            post(handlers::resolve_sos_request),
        )
        // Analytics
        .route("/api/analytics/summary", get(handlers::analytics_summary))
        .route(
            "/api/analytics/crowd-reports",
            get(handlers::crowd_report_analytics),
        )
        .route(
            "/api/analytics/sos-requests",
            get(handlers::sos_request_analytics),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            limit::rate_limit_middleware,
        ));

    let mut router = Router::new().route("/api/health", get(handlers::health));
    if live_feed {
        router = router.route("/ws", get(ws::ws_feed));
    }
    router
        .merge(limited)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
