//! HTTP server lifecycle.
//!
//! [`start_server`] binds the configured address and serves the router
//! until the process is terminated. Connections are served with peer
//! address info attached so the rate limiter can fall back to the
//! socket address when no `X-Forwarded-For` header is present.

use std::net::SocketAddr;
use std::sync::Arc;

use groundwatch_core::config::ServiceConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router_with_live_feed;
use crate::state::AppState;

/// Start the HTTP server on the configured host and port.
///
/// The `/ws` endpoint is only mounted when `realtime.enabled` is set.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address is invalid or the
/// listener cannot bind, and [`ServerError::Serve`] on a fatal I/O
/// error while serving.
pub async fn start_server(config: &ServiceConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let router = build_router_with_live_feed(state, config.realtime.enabled);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("{addr}: {e}")))?;

    info!(%addr, live_feed = config.realtime.enabled, "groundwatch api listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| ServerError::Serve(e.to_string()))?;

    Ok(())
}

/// Errors that can occur when starting or running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
