//! HTTP + `WebSocket` surface for the Groundwatch backend.
//!
//! This crate provides the Axum server that exposes:
//!
//! - **REST endpoints** under `/api` for crowd reports, SOS requests,
//!   and the analytics views, all backed by the incident service
//! - **`WebSocket` endpoint** (`/ws`) streaming channel-filtered
//!   broadcast envelopes to the live map
//! - **Admission middleware** charging every API request against its
//!   client's fixed rate window
//!
//! # Architecture
//!
//! Handlers are thin: validate at the boundary, call one
//! [`IncidentService`] method, map the result onto a response. All error
//! responses share one JSON shape (`kind` + `error`), produced by
//! [`error::ApiError`]. The `WebSocket` side owns no state beyond its
//! connection registration; fan-out and slow-consumer policy live in
//! `groundwatch-broadcast`.
//!
//! [`IncidentService`]: groundwatch_service::IncidentService

pub mod error;
pub mod handlers;
pub mod limit;
pub mod requests;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::{build_router, build_router_with_live_feed};
pub use server::{ServerError, start_server};
pub use state::AppState;
