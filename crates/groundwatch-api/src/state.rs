//! Shared application state for the HTTP surface.
//!
//! [`AppState`] bundles everything a handler can touch: the incident
//! service for lifecycle operations, the broadcast registry for the live
//! feed and the health connection count, and the rate limiter consulted
//! by the admission middleware. It is wrapped in [`Arc`] and injected via
//! Axum's `State` extractor.

use std::sync::Arc;

use groundwatch_broadcast::Broadcaster;
use groundwatch_core::limiter::RateLimiter;
use groundwatch_service::IncidentService;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// Incident lifecycle operations.
    pub service: IncidentService,
    /// Connection registry backing `/ws` and the health connection count.
    pub broadcaster: Arc<Broadcaster>,
    /// Per-client admission control for the API routes.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Bundle the already-constructed subsystems into one state value.
    pub fn new(
        service: IncidentService,
        broadcaster: Arc<Broadcaster>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            service,
            broadcaster,
            limiter,
        }
    }
}
