//! Per-client admission middleware for the API routes.
//!
//! Every request through the layer is charged against the rate window of
//! its client identity: the first hop of `X-Forwarded-For` when a proxy
//! set one, otherwise the socket peer address. Rejected requests answer
//! 429 with a `Retry-After` header; they still count against the window,
//! so hammering a closed door does not reopen it sooner.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use groundwatch_core::limiter::Admission;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Admit or reject the request against the client's rate window.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_identity(&request);
    match state.limiter.admit(&client).await {
        Admission::Allowed => Ok(next.run(request).await),
        Admission::Limited { retry_after_secs } => {
            debug!(%client, retry_after_secs, "request rejected by rate limiter");
            Err(ApiError::RateLimited { retry_after_secs })
        }
    }
}

/// Resolve the identity a request is rate limited under.
///
/// The first `X-Forwarded-For` hop wins so clients behind the deployment's
/// proxy are limited individually rather than as one; without the header
/// the socket peer address is used. Requests with neither (only seen in
/// in-process tests, where no socket exists) share one bucket.
fn client_identity(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty());
    if let Some(hop) = forwarded {
        return hop.to_owned();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| String::from("unknown"), |peer| peer.0.ip().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn bare_request() -> Request {
        Request::new(Body::empty())
    }

    #[test]
    fn forwarded_header_takes_the_first_hop() {
        let mut request = bare_request();
        request.headers_mut().insert(
            "x-forwarded-for",
            "203.0.113.9, 198.51.100.2".parse().unwrap(),
        );
        assert_eq!(client_identity(&request), "203.0.113.9");
    }

    #[test]
    fn forwarded_header_is_trimmed() {
        let mut request = bare_request();
        request
            .headers_mut()
            .insert("x-forwarded-for", "  203.0.113.9 ".parse().unwrap());
        assert_eq!(client_identity(&request), "203.0.113.9");
    }

    #[test]
    fn empty_forwarded_header_falls_through_to_the_peer() {
        let mut request = bare_request();
        request
            .headers_mut()
            .insert("x-forwarded-for", " ".parse().unwrap());
        let peer: SocketAddr = "192.0.2.4:5123".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(client_identity(&request), "192.0.2.4");
    }

    #[test]
    fn peer_address_drops_the_port() {
        let mut request = bare_request();
        let peer: SocketAddr = "192.0.2.4:5123".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(client_identity(&request), "192.0.2.4");
    }

    #[test]
    fn no_identity_sources_share_one_bucket() {
        assert_eq!(client_identity(&bare_request()), "unknown");
    }
}
