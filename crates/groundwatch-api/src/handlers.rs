//! REST endpoint handlers.
//!
//! All handlers go through the [`IncidentService`] on the shared
//! [`AppState`]; none of them touch the store or the broadcaster
//! directly. Bodies are validated before anything else happens, so a
//! rejected request has no side effects.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/health` | Liveness + live-feed connection count |
//! | `GET` | `/api/crowd-reports` | Filterable report listing |
//! | `GET` | `/api/crowd-reports/nearby` | Reports within a radius, nearest first |
//! | `GET` | `/api/crowd-reports/{id}` | Single report |
//! | `POST` | `/api/crowd-reports` | Create a report |
//! | `PUT` | `/api/crowd-reports/{id}` | Patch a report |
//! | `POST` | `/api/crowd-reports/{id}/upvote` | Confirm a report |
//! | `POST` | `/api/crowd-reports/{id}/resolve` | Close a report |
//! | `DELETE` | `/api/crowd-reports/{id}` | Remove a report |
//! | ... | `/api/sos-requests/...` | Same shape; `respond`/`resolve` actions, no upvote |
//! | `GET` | `/api/analytics/summary` | Per-status totals for both kinds |
//! | `GET` | `/api/analytics/crowd-reports` | Report groupings, trend, leaderboard |
//! | `GET` | `/api/analytics/sos-requests` | Request groupings, trend, pending age |
//!
//! [`IncidentService`]: groundwatch_service::IncidentService

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use groundwatch_core::geo::Point;
use groundwatch_service::{CrowdReportFilter, SosRequestFilter};
use groundwatch_types::{
    CrowdReportId, EmergencyType, ReportStatus, ReportType, Severity, SosRequestId, SosStatus,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::requests::{
    CreateCrowdReportBody, CreateSosRequestBody, UpdateCrowdReportBody, UpdateSosRequestBody,
};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/crowd-reports`.
#[derive(Debug, serde::Deserialize)]
pub struct CrowdReportListQuery {
    /// Keep only reports in this status.
    pub status: Option<ReportStatus>,
    /// Keep only reports of this hazard kind.
    pub report_type: Option<ReportType>,
    /// Keep only reports of this severity.
    pub severity: Option<Severity>,
    /// Page size (default 50).
    pub limit: Option<u64>,
    /// Records to skip (default 0).
    pub offset: Option<u64>,
    /// Origin latitude for distance annotation.
    pub latitude: Option<f64>,
    /// Origin longitude for distance annotation.
    pub longitude: Option<f64>,
    /// With a full origin, drop results farther than this many meters.
    pub radius: Option<f64>,
}

impl CrowdReportListQuery {
    /// Lower into the service filter. A half-specified origin (one
    /// coordinate without the other) is treated as no origin at all.
    fn into_filter(self) -> CrowdReportFilter {
        CrowdReportFilter {
            status: self.status,
            severity: self.severity,
            report_type: self.report_type,
            limit: self.limit,
            offset: self.offset,
            origin: full_origin(self.latitude, self.longitude),
            radius_m: self.radius,
        }
    }
}

/// Query parameters for `GET /api/sos-requests`.
#[derive(Debug, serde::Deserialize)]
pub struct SosRequestListQuery {
    /// Keep only requests in this status.
    pub status: Option<SosStatus>,
    /// Keep only requests of this emergency kind.
    pub emergency_type: Option<EmergencyType>,
    /// Page size (default 50).
    pub limit: Option<u64>,
    /// Records to skip (default 0).
    pub offset: Option<u64>,
    /// Origin latitude for distance annotation.
    pub latitude: Option<f64>,
    /// Origin longitude for distance annotation.
    pub longitude: Option<f64>,
    /// With a full origin, drop results farther than this many meters.
    pub radius: Option<f64>,
}

impl SosRequestListQuery {
    fn into_filter(self) -> SosRequestFilter {
        SosRequestFilter {
            status: self.status,
            emergency_type: self.emergency_type,
            limit: self.limit,
            offset: self.offset,
            origin: full_origin(self.latitude, self.longitude),
            radius_m: self.radius,
        }
    }
}

/// Query parameters for the `nearby` endpoints, where the origin is
/// mandatory.
#[derive(Debug, serde::Deserialize)]
pub struct NearbyQuery {
    /// Origin latitude.
    pub latitude: Option<f64>,
    /// Origin longitude.
    pub longitude: Option<f64>,
    /// Search radius in meters (default 1000).
    pub radius: Option<f64>,
}

impl NearbyQuery {
    /// The query origin, or a validation error naming what is missing.
    fn origin(&self) -> Result<Point, ApiError> {
        full_origin(self.latitude, self.longitude).ok_or_else(|| {
            ApiError::BadRequest("latitude and longitude are required".to_owned())
        })
    }
}

/// Query parameters for the analytics endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct AnalyticsQuery {
    /// Trend window in days (default from configuration).
    pub days: Option<u32>,
}

/// Both coordinates or nothing.
const fn full_origin(latitude: Option<f64>, longitude: Option<f64>) -> Option<Point> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Point::new(latitude, longitude)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// `GET /api/health`
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let connections = state.broadcaster.connection_count().await;
    Json(json!({
        "status": "ok",
        "message": "Backend is running",
        "connections": connections,
    }))
}

// ---------------------------------------------------------------------------
// Crowd reports
// ---------------------------------------------------------------------------

/// `GET /api/crowd-reports`
///
/// Newest first. With a full origin each record is annotated with its
/// distance from it; adding `radius` additionally drops records beyond
/// it, without reordering.
pub async fn list_crowd_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CrowdReportListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.service.list_crowd_reports(params.into_filter()).await?;
    Ok(Json(listing))
}

/// `GET /api/crowd-reports/nearby`
///
/// Active reports within the radius, nearest first.
pub async fn nearby_crowd_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let origin = params.origin()?;
    let hits = state.service.nearby_crowd_reports(origin, params.radius).await?;
    Ok(Json(hits))
}

/// `GET /api/crowd-reports/{id}`
pub async fn get_crowd_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CrowdReportId::from(parse_uuid(&id)?);
    let report = state.service.get_crowd_report(id).await?;
    Ok(Json(report))
}

/// `POST /api/crowd-reports` -- 201 with the stored record.
pub async fn create_crowd_report(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateCrowdReportBody>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let report = state.service.create_crowd_report(body.into_new()).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// `PUT /api/crowd-reports/{id}`
pub async fn update_crowd_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCrowdReportBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CrowdReportId::from(parse_uuid(&id)?);
    body.validate()?;
    let report = state.service.update_crowd_report(id, &body.into_patch()).await?;
    Ok(Json(report))
}

/// `POST /api/crowd-reports/{id}/upvote`
pub async fn upvote_crowd_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CrowdReportId::from(parse_uuid(&id)?);
    let report = state.service.upvote_crowd_report(id).await?;
    Ok(Json(report))
}

/// `POST /api/crowd-reports/{id}/resolve`
pub async fn resolve_crowd_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CrowdReportId::from(parse_uuid(&id)?);
    let report = state.service.resolve_crowd_report(id).await?;
    Ok(Json(report))
}

/// `DELETE /api/crowd-reports/{id}`
pub async fn delete_crowd_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = CrowdReportId::from(parse_uuid(&id)?);
    state.service.delete_crowd_report(id).await?;
    Ok(Json(json!({ "message": "Report deleted successfully" })))
}

// ---------------------------------------------------------------------------
// SOS requests
// ---------------------------------------------------------------------------

/// `GET /api/sos-requests`
pub async fn list_sos_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SosRequestListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listing = state.service.list_sos_requests(params.into_filter()).await?;
    Ok(Json(listing))
}

/// `GET /api/sos-requests/nearby`
///
/// Unresolved (pending or responding) requests within the radius,
/// nearest first.
pub async fn nearby_sos_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let origin = params.origin()?;
    let hits = state.service.nearby_sos_requests(origin, params.radius).await?;
    Ok(Json(hits))
}

/// `GET /api/sos-requests/{id}`
pub async fn get_sos_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = SosRequestId::from(parse_uuid(&id)?);
    let request = state.service.get_sos_request(id).await?;
    Ok(Json(request))
}

/// `POST /api/sos-requests` -- 201 with the stored record.
pub async fn create_sos_request(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSosRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate()?;
    let request = state.service.create_sos_request(body.into_new()).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// `PUT /api/sos-requests/{id}`
pub async fn update_sos_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSosRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let id = SosRequestId::from(parse_uuid(&id)?);
    body.validate()?;
    let request = state.service.update_sos_request(id, &body.into_patch()).await?;
    Ok(Json(request))
}

/// `POST /api/sos-requests/{id}/respond`
pub async fn respond_sos_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = SosRequestId::from(parse_uuid(&id)?);
    let request = state.service.respond_sos_request(id).await?;
    Ok(Json(request))
}

/// `POST /api/sos-requests/{id}/resolve`
pub async fn resolve_sos_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = SosRequestId::from(parse_uuid(&id)?);
    let request = state.service.resolve_sos_request(id).await?;
    Ok(Json(request))
}

/// `DELETE /api/sos-requests/{id}`
pub async fn delete_sos_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = SosRequestId::from(parse_uuid(&id)?);
    state.service.delete_sos_request(id).await?;
    Ok(Json(json!({ "message": "SOS request deleted successfully" })))
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// `GET /api/analytics/summary`
pub async fn analytics_summary(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.service.summary().await?;
    Ok(Json(summary))
}

/// `GET /api/analytics/crowd-reports`
pub async fn crowd_report_analytics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let analytics = state.service.crowd_report_analytics(params.days).await?;
    Ok(Json(analytics))
}

/// `GET /api/analytics/sos-requests`
pub async fn sos_request_analytics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyticsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let analytics = state.service.sos_request_analytics(params.days).await?;
    Ok(Json(analytics))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a path segment as a UUID.
fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn half_specified_origin_is_dropped() {
        assert!(full_origin(Some(1.0), None).is_none());
        assert!(full_origin(None, Some(1.0)).is_none());
        assert!(full_origin(None, None).is_none());
        assert!(full_origin(Some(1.0), Some(2.0)).is_some());
    }

    #[test]
    fn nearby_query_requires_both_coordinates() {
        let partial = NearbyQuery {
            latitude: Some(30.0),
            longitude: None,
            radius: None,
        };
        assert!(partial.origin().is_err());

        let full = NearbyQuery {
            latitude: Some(30.0),
            longitude: Some(-97.0),
            radius: Some(250.0),
        };
        assert!(full.origin().is_ok());
    }

    #[test]
    fn bad_uuid_is_a_validation_failure() {
        let err = parse_uuid("not-a-uuid").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
