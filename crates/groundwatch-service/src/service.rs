//! Incident lifecycle orchestration over the store and the broadcaster.
//!
//! [`IncidentService`] is the single entry point for everything the HTTP
//! layer does to incidents. Every mutating method persists first and
//! publishes second, so live subscribers never see an event for a write
//! that failed. Status transitions are guarded here (forward-only), and
//! all geo filtering and analytics aggregation runs here over lists
//! fetched from the store in canonical newest-first order, which keeps
//! results identical across store backends.

use std::sync::Arc;

use chrono::Utc;
use groundwatch_broadcast::Broadcaster;
use groundwatch_core::config::AnalyticsConfig;
use groundwatch_core::geo::{Located, Point, annotate, within_radius};
use groundwatch_core::trends::{average_pending_minutes, daily_trend, group_counts};
use groundwatch_db::{CrowdReportQuery, IncidentStore, PurgeCounts, SosRequestQuery};
use groundwatch_types::{
    BroadcastEnvelope, Channel, CrowdReport, CrowdReportAnalytics, CrowdReportId,
    CrowdReportPatch, CrowdReportTotals, EmergencyType, EmergencyTypeCount, EventKind,
    NewCrowdReport, NewSosRequest, ReportStatus, ReportStatusCount, ReportType, ReportTypeCount,
    Severity, SeverityCount, SosRequest, SosRequestId, SosRequestPatch, SosRequestTotals,
    SosStatus, SosStatusCount, SummaryReport,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, report_store_error, sos_store_error};

/// Radius in meters applied to nearby queries when the client omits one.
pub const DEFAULT_NEARBY_RADIUS_M: f64 = 1000.0;

/// Page size applied to list queries when the client omits one.
pub const DEFAULT_LIST_LIMIT: u64 = 50;

/// How many reports the analytics upvote leaderboard returns.
const TOP_REPORT_COUNT: usize = 10;

// ---------------------------------------------------------------------------
// List filters and results
// ---------------------------------------------------------------------------

/// Client-facing filter for crowd report listings.
///
/// Filtering and pagination run in the store; the optional position is
/// applied afterwards, over the already-paged rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrowdReportFilter {
    /// Exact status match, if filtering.
    pub status: Option<ReportStatus>,
    /// Exact severity match, if filtering.
    pub severity: Option<Severity>,
    /// Exact hazard type match, if filtering.
    pub report_type: Option<ReportType>,
    /// Page size; defaults to [`DEFAULT_LIST_LIMIT`].
    pub limit: Option<u64>,
    /// Rows skipped from the front; defaults to 0.
    pub offset: Option<u64>,
    /// Client position for distance annotation.
    pub origin: Option<Point>,
    /// Keep only rows within this many meters of `origin`.
    pub radius_m: Option<f64>,
}

/// Client-facing filter for SOS request listings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SosRequestFilter {
    /// Exact status match, if filtering.
    pub status: Option<SosStatus>,
    /// Exact emergency type match, if filtering.
    pub emergency_type: Option<EmergencyType>,
    /// Page size; defaults to [`DEFAULT_LIST_LIMIT`].
    pub limit: Option<u64>,
    /// Rows skipped from the front; defaults to 0.
    pub offset: Option<u64>,
    /// Client position for distance annotation.
    pub origin: Option<Point>,
    /// Keep only rows within this many meters of `origin`.
    pub radius_m: Option<f64>,
}

/// Crowd report list results: plain records, or distance-annotated when
/// the client supplied a position. Either way the order is newest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CrowdReportListing {
    /// No position supplied.
    Plain(Vec<CrowdReport>),
    /// Position supplied; each record carries its distance from it.
    Annotated(Vec<Located<CrowdReport>>),
}

/// SOS request list results, mirroring [`CrowdReportListing`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SosRequestListing {
    /// No position supplied.
    Plain(Vec<SosRequest>),
    /// Position supplied; each record carries its distance from it.
    Annotated(Vec<Located<SosRequest>>),
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Orchestrates incident reads, writes, and event publication.
///
/// Cheap to clone; the store and broadcaster are shared behind [`Arc`]s.
#[derive(Clone)]
pub struct IncidentService {
    store: Arc<dyn IncidentStore>,
    broadcaster: Arc<Broadcaster>,
    analytics: AnalyticsConfig,
}

impl IncidentService {
    /// Build a service over a store backend and a broadcast registry.
    pub fn new(
        store: Arc<dyn IncidentStore>,
        broadcaster: Arc<Broadcaster>,
        analytics: AnalyticsConfig,
    ) -> Self {
        Self {
            store,
            broadcaster,
            analytics,
        }
    }

    /// Serialize `payload` and fan it out on `channel`.
    ///
    /// Broadcast failures never surface to the caller; a payload that
    /// cannot serialize is logged and dropped.
    async fn publish(&self, channel: Channel, event: EventKind, payload: &impl Serialize) {
        let data = match serde_json::to_value(payload) {
            Ok(data) => data,
            Err(err) => {
                warn!(?channel, ?event, error = %err, "dropping unserializable broadcast payload");
                return;
            }
        };
        let envelope = BroadcastEnvelope::new(channel, event, data, Utc::now());
        let delivered = self.broadcaster.publish(&envelope).await;
        debug!(?channel, ?event, delivered, "published incident event");
    }

    // -----------------------------------------------------------------------
    // Crowd reports
    // -----------------------------------------------------------------------

    /// Persist a new crowd report and announce it on `crowd-reports`.
    pub async fn create_crowd_report(
        &self,
        new: NewCrowdReport,
    ) -> Result<CrowdReport, ServiceError> {
        let report = CrowdReport::create(new, Utc::now());
        self.store
            .insert_crowd_report(&report)
            .await
            .map_err(report_store_error)?;
        info!(id = %report.id, report_type = ?report.report_type, severity = ?report.severity, "crowd report created");
        self.publish(Channel::CrowdReports, EventKind::Created, &report)
            .await;
        Ok(report)
    }

    /// Fetch one crowd report.
    pub async fn get_crowd_report(&self, id: CrowdReportId) -> Result<CrowdReport, ServiceError> {
        self.store
            .get_crowd_report(id)
            .await
            .map_err(report_store_error)
    }

    /// List crowd reports, newest first, with optional distance handling.
    ///
    /// When the filter carries a position and a radius, rows farther than
    /// the radius are dropped from the page without re-sorting; a position
    /// alone only annotates distances.
    pub async fn list_crowd_reports(
        &self,
        filter: CrowdReportFilter,
    ) -> Result<CrowdReportListing, ServiceError> {
        let query = CrowdReportQuery {
            statuses: filter.status.into_iter().collect(),
            severity: filter.severity,
            report_type: filter.report_type,
            limit: Some(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT)),
            offset: filter.offset.unwrap_or(0),
        };
        let reports = self
            .store
            .list_crowd_reports(&query)
            .await
            .map_err(report_store_error)?;

        Ok(match (filter.origin, filter.radius_m) {
            (Some(origin), Some(radius_m)) => {
                let mut hits = annotate(origin, reports);
                hits.retain(|hit| hit.distance <= radius_m);
                CrowdReportListing::Annotated(hits)
            }
            (Some(origin), None) => CrowdReportListing::Annotated(annotate(origin, reports)),
            (None, _) => CrowdReportListing::Plain(reports),
        })
    }

    /// Active crowd reports within a radius of `origin`, nearest first.
    pub async fn nearby_crowd_reports(
        &self,
        origin: Point,
        radius_m: Option<f64>,
    ) -> Result<Vec<Located<CrowdReport>>, ServiceError> {
        let query = CrowdReportQuery {
            statuses: vec![ReportStatus::Active],
            ..CrowdReportQuery::default()
        };
        let reports = self
            .store
            .list_crowd_reports(&query)
            .await
            .map_err(report_store_error)?;
        Ok(within_radius(
            origin,
            radius_m.unwrap_or(DEFAULT_NEARBY_RADIUS_M),
            reports,
        ))
    }

    /// Apply a partial update and announce the new record state.
    ///
    /// An empty patch is a plain read: no store write, no broadcast. A
    /// status change is checked against the forward-only transition set;
    /// restating the current status is not a transition and passes.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Conflict`] on a backward status move,
    /// [`ServiceError::NotFound`] when the id does not exist.
    pub async fn update_crowd_report(
        &self,
        id: CrowdReportId,
        patch: &CrowdReportPatch,
    ) -> Result<CrowdReport, ServiceError> {
        if patch.is_empty() {
            return self.get_crowd_report(id).await;
        }

        let current = self.get_crowd_report(id).await?;
        if let Some(next) = patch.status
            && next != current.status
            && !current.status.allows_transition_to(next)
        {
            let from = current.status;
            return Err(ServiceError::Conflict(format!(
                "invalid status transition: {from} -> {next}"
            )));
        }

        let updated = self
            .store
            .update_crowd_report(id, patch, Utc::now())
            .await
            .map_err(report_store_error)?;
        debug!(id = %id, "crowd report updated");
        self.publish(Channel::CrowdReports, EventKind::Updated, &updated)
            .await;
        Ok(updated)
    }

    /// Transition an active crowd report to resolved.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Conflict`] when the report is already resolved.
    pub async fn resolve_crowd_report(
        &self,
        id: CrowdReportId,
    ) -> Result<CrowdReport, ServiceError> {
        let current = self.get_crowd_report(id).await?;
        if !current.status.allows_transition_to(ReportStatus::Resolved) {
            let from = current.status;
            return Err(ServiceError::Conflict(format!(
                "invalid status transition: {from} -> resolved"
            )));
        }

        let patch = CrowdReportPatch {
            status: Some(ReportStatus::Resolved),
            ..CrowdReportPatch::default()
        };
        let resolved = self
            .store
            .update_crowd_report(id, &patch, Utc::now())
            .await
            .map_err(report_store_error)?;
        info!(id = %id, "crowd report resolved");
        self.publish(Channel::CrowdReports, EventKind::Updated, &resolved)
            .await;
        Ok(resolved)
    }

    /// Atomically add one upvote and announce the new count.
    ///
    /// The increment happens in the store, so concurrent upvotes of the
    /// same report all land.
    pub async fn upvote_crowd_report(
        &self,
        id: CrowdReportId,
    ) -> Result<CrowdReport, ServiceError> {
        let report = self
            .store
            .upvote_crowd_report(id, Utc::now())
            .await
            .map_err(report_store_error)?;
        debug!(id = %id, upvotes = report.upvotes, "crowd report upvoted");
        self.publish(Channel::CrowdReports, EventKind::Updated, &report)
            .await;
        Ok(report)
    }

    /// Delete a crowd report and announce the deletion, carrying only the
    /// id.
    pub async fn delete_crowd_report(&self, id: CrowdReportId) -> Result<(), ServiceError> {
        self.store
            .delete_crowd_report(id)
            .await
            .map_err(report_store_error)?;
        info!(id = %id, "crowd report deleted");
        self.publish(
            Channel::CrowdReports,
            EventKind::Deleted,
            &serde_json::json!({ "id": id }),
        )
        .await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // SOS requests
    // -----------------------------------------------------------------------

    /// Persist a new SOS request and announce it on `sos-requests`.
    pub async fn create_sos_request(
        &self,
        new: NewSosRequest,
    ) -> Result<SosRequest, ServiceError> {
        let request = SosRequest::create(new, Utc::now());
        self.store
            .insert_sos_request(&request)
            .await
            .map_err(sos_store_error)?;
        info!(id = %request.id, emergency_type = ?request.emergency_type, "sos request created");
        self.publish(Channel::SosRequests, EventKind::Created, &request)
            .await;
        Ok(request)
    }

    /// Fetch one SOS request.
    pub async fn get_sos_request(&self, id: SosRequestId) -> Result<SosRequest, ServiceError> {
        self.store
            .get_sos_request(id)
            .await
            .map_err(sos_store_error)
    }

    /// List SOS requests, newest first, with optional distance handling.
    pub async fn list_sos_requests(
        &self,
        filter: SosRequestFilter,
    ) -> Result<SosRequestListing, ServiceError> {
        let query = SosRequestQuery {
            statuses: filter.status.into_iter().collect(),
            emergency_type: filter.emergency_type,
            limit: Some(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT)),
            offset: filter.offset.unwrap_or(0),
        };
        let requests = self
            .store
            .list_sos_requests(&query)
            .await
            .map_err(sos_store_error)?;

        Ok(match (filter.origin, filter.radius_m) {
            (Some(origin), Some(radius_m)) => {
                let mut hits = annotate(origin, requests);
                hits.retain(|hit| hit.distance <= radius_m);
                SosRequestListing::Annotated(hits)
            }
            (Some(origin), None) => SosRequestListing::Annotated(annotate(origin, requests)),
            (None, _) => SosRequestListing::Plain(requests),
        })
    }

    /// Unresolved SOS requests within a radius of `origin`, nearest first.
    ///
    /// Candidates are pending and responding requests; resolved ones no
    /// longer need a responder.
    pub async fn nearby_sos_requests(
        &self,
        origin: Point,
        radius_m: Option<f64>,
    ) -> Result<Vec<Located<SosRequest>>, ServiceError> {
        let query = SosRequestQuery {
            statuses: vec![SosStatus::Pending, SosStatus::Responding],
            ..SosRequestQuery::default()
        };
        let requests = self
            .store
            .list_sos_requests(&query)
            .await
            .map_err(sos_store_error)?;
        Ok(within_radius(
            origin,
            radius_m.unwrap_or(DEFAULT_NEARBY_RADIUS_M),
            requests,
        ))
    }

    /// Apply a partial update and announce the new record state.
    ///
    /// Same contract as [`Self::update_crowd_report`]: empty patches are
    /// reads, status changes go through the forward-only guard.
    pub async fn update_sos_request(
        &self,
        id: SosRequestId,
        patch: &SosRequestPatch,
    ) -> Result<SosRequest, ServiceError> {
        if patch.is_empty() {
            return self.get_sos_request(id).await;
        }

        let current = self.get_sos_request(id).await?;
        if let Some(next) = patch.status
            && next != current.status
            && !current.status.allows_transition_to(next)
        {
            let from = current.status;
            return Err(ServiceError::Conflict(format!(
                "invalid status transition: {from} -> {next}"
            )));
        }

        let updated = self
            .store
            .update_sos_request(id, patch, Utc::now())
            .await
            .map_err(sos_store_error)?;
        debug!(id = %id, "sos request updated");
        self.publish(Channel::SosRequests, EventKind::Updated, &updated)
            .await;
        Ok(updated)
    }

    /// Mark a pending SOS request as being responded to.
    pub async fn respond_sos_request(&self, id: SosRequestId) -> Result<SosRequest, ServiceError> {
        self.transition_sos_request(id, SosStatus::Responding).await
    }

    /// Close out an SOS request.
    ///
    /// `pending -> resolved` is accepted directly; a responder can close a
    /// request they never marked as in-progress.
    pub async fn resolve_sos_request(&self, id: SosRequestId) -> Result<SosRequest, ServiceError> {
        self.transition_sos_request(id, SosStatus::Resolved).await
    }

    /// Shared guard-and-update path for the SOS transition actions.
    async fn transition_sos_request(
        &self,
        id: SosRequestId,
        next: SosStatus,
    ) -> Result<SosRequest, ServiceError> {
        let current = self.get_sos_request(id).await?;
        if !current.status.allows_transition_to(next) {
            let from = current.status;
            return Err(ServiceError::Conflict(format!(
                "invalid status transition: {from} -> {next}"
            )));
        }

        let patch = SosRequestPatch {
            status: Some(next),
            ..SosRequestPatch::default()
        };
        let updated = self
            .store
            .update_sos_request(id, &patch, Utc::now())
            .await
            .map_err(sos_store_error)?;
        info!(id = %id, status = %next, "sos request transitioned");
        self.publish(Channel::SosRequests, EventKind::Updated, &updated)
            .await;
        Ok(updated)
    }

    /// Delete an SOS request and announce the deletion, carrying only the
    /// id.
    pub async fn delete_sos_request(&self, id: SosRequestId) -> Result<(), ServiceError> {
        self.store
            .delete_sos_request(id)
            .await
            .map_err(sos_store_error)?;
        info!(id = %id, "sos request deleted");
        self.publish(
            Channel::SosRequests,
            EventKind::Deleted,
            &serde_json::json!({ "id": id }),
        )
        .await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Analytics
    // -----------------------------------------------------------------------

    /// Headline status counts for both incident variants.
    pub async fn summary(&self) -> Result<SummaryReport, ServiceError> {
        let reports = self
            .store
            .list_crowd_reports(&CrowdReportQuery::default())
            .await
            .map_err(report_store_error)?;
        let requests = self
            .store
            .list_sos_requests(&SosRequestQuery::default())
            .await
            .map_err(sos_store_error)?;

        Ok(SummaryReport {
            crowd_reports: CrowdReportTotals {
                total: as_count(reports.len()),
                active: count_reports(&reports, ReportStatus::Active),
                resolved: count_reports(&reports, ReportStatus::Resolved),
            },
            sos_requests: SosRequestTotals {
                total: as_count(requests.len()),
                pending: count_requests(&requests, SosStatus::Pending),
                responding: count_requests(&requests, SosStatus::Responding),
                resolved: count_requests(&requests, SosStatus::Resolved),
            },
        })
    }

    /// Crowd report breakdowns: group counts, a zero-filled daily trend
    /// over `days` (default from config), and the upvote leaderboard.
    pub async fn crowd_report_analytics(
        &self,
        days: Option<u32>,
    ) -> Result<CrowdReportAnalytics, ServiceError> {
        let days = days.unwrap_or(self.analytics.default_trend_days);
        let reports = self
            .store
            .list_crowd_reports(&CrowdReportQuery::default())
            .await
            .map_err(report_store_error)?;
        let now = Utc::now();

        let by_type = group_counts(reports.iter().map(|r| r.report_type))
            .into_iter()
            .map(|(report_type, count)| ReportTypeCount { report_type, count })
            .collect();
        let by_severity = group_counts(reports.iter().map(|r| r.severity))
            .into_iter()
            .map(|(severity, count)| SeverityCount { severity, count })
            .collect();
        let by_status = group_counts(reports.iter().map(|r| r.status))
            .into_iter()
            .map(|(status, count)| ReportStatusCount { status, count })
            .collect();
        let recent_trends = daily_trend(reports.iter().map(|r| r.created_at), days, now);

        // The input is newest-first, and the sort is stable, so upvote
        // ties stay newest-first.
        let mut top_reports: Vec<CrowdReport> = reports
            .into_iter()
            .filter(|r| r.status == ReportStatus::Active)
            .collect();
        top_reports.sort_by(|a, b| b.upvotes.cmp(&a.upvotes));
        top_reports.truncate(TOP_REPORT_COUNT);

        Ok(CrowdReportAnalytics {
            by_type,
            by_severity,
            by_status,
            recent_trends,
            top_reports,
        })
    }

    /// SOS request breakdowns: group counts, a zero-filled daily trend,
    /// and the mean age of still-pending requests.
    pub async fn sos_request_analytics(
        &self,
        days: Option<u32>,
    ) -> Result<SosRequestAnalytics, ServiceError> {
        let days = days.unwrap_or(self.analytics.default_trend_days);
        let requests = self
            .store
            .list_sos_requests(&SosRequestQuery::default())
            .await
            .map_err(sos_store_error)?;
        let now = Utc::now();

        let by_type = group_counts(requests.iter().map(|r| r.emergency_type))
            .into_iter()
            .map(|(emergency_type, count)| EmergencyTypeCount {
                emergency_type,
                count,
            })
            .collect();
        let by_status = group_counts(requests.iter().map(|r| r.status))
            .into_iter()
            .map(|(status, count)| SosStatusCount { status, count })
            .collect();
        let recent_trends = daily_trend(requests.iter().map(|r| r.created_at), days, now);
        let avg_response_time_minutes = average_pending_minutes(
            requests
                .iter()
                .filter(|r| r.status == SosStatus::Pending)
                .map(|r| r.created_at),
            now,
        );

        Ok(SosRequestAnalytics {
            by_type,
            by_status,
            recent_trends,
            avg_response_time_minutes,
        })
    }

    // -----------------------------------------------------------------------
    // Retention
    // -----------------------------------------------------------------------

    /// Delete resolved incidents untouched for more than `older_than_days`
    /// days.
    ///
    /// Deletions are silent on the live feed; the records being purged
    /// stopped mattering to the map long ago.
    pub async fn purge_resolved(&self, older_than_days: u32) -> Result<PurgeCounts, ServiceError> {
        let Some(cutoff) = chrono::Duration::try_days(i64::from(older_than_days))
            .and_then(|age| Utc::now().checked_sub_signed(age))
        else {
            warn!(older_than_days, "retention cutoff out of range, skipping purge");
            return Ok(PurgeCounts::default());
        };

        let counts = self
            .store
            .purge_resolved_before(cutoff)
            .await
            .map_err(ServiceError::Store)?;
        if counts.total() > 0 {
            info!(
                crowd_reports = counts.crowd_reports,
                sos_requests = counts.sos_requests,
                "purged stale resolved incidents"
            );
        }
        Ok(counts)
    }
}

/// Collection size as a wire count; saturates on (impossible) overflow.
fn as_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

fn count_reports(reports: &[CrowdReport], status: ReportStatus) -> u64 {
    as_count(reports.iter().filter(|r| r.status == status).count())
}

fn count_requests(requests: &[SosRequest], status: SosStatus) -> u64 {
    as_count(requests.iter().filter(|r| r.status == status).count())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use groundwatch_db::MemoryStore;
    use tokio::sync::mpsc;

    use super::*;

    fn harness() -> (IncidentService, Arc<Broadcaster>) {
        let broadcaster = Arc::new(Broadcaster::new(16));
        let service = IncidentService::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&broadcaster),
            AnalyticsConfig::default(),
        );
        (service, broadcaster)
    }

    fn report_input(latitude: f64, longitude: f64) -> NewCrowdReport {
        classified_input(ReportType::Mud, Severity::Medium, latitude, longitude)
    }

    fn classified_input(
        report_type: ReportType,
        severity: Severity,
        latitude: f64,
        longitude: f64,
    ) -> NewCrowdReport {
        NewCrowdReport {
            report_type,
            description: Some("near the main stage".to_owned()),
            latitude,
            longitude,
            severity,
        }
    }

    fn sos_input(latitude: f64, longitude: f64) -> NewSosRequest {
        NewSosRequest {
            emergency_type: EmergencyType::Medical,
            description: None,
            latitude,
            longitude,
            contact_phone: None,
        }
    }

    async fn next_envelope(rx: &mut mpsc::Receiver<String>) -> BroadcastEnvelope {
        let raw = rx.recv().await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn create_crowd_report_persists_then_publishes() {
        let (service, broadcaster) = harness();
        let (_, mut rx) = broadcaster.register().await;

        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();

        let envelope = next_envelope(&mut rx).await;
        assert_eq!(envelope.channel, Channel::CrowdReports);
        assert_eq!(envelope.event, EventKind::Created);
        assert_eq!(
            envelope.data.get("id").and_then(|id| id.as_str()),
            Some(report.id.to_string().as_str())
        );
        assert_eq!(service.get_crowd_report(report.id).await.unwrap(), report);
    }

    #[tokio::test]
    async fn create_sos_request_publishes_on_its_channel() {
        let (service, broadcaster) = harness();
        let (_, mut rx) = broadcaster.register().await;

        let request = service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();
        assert_eq!(request.status, SosStatus::Pending);

        let envelope = next_envelope(&mut rx).await;
        assert_eq!(envelope.channel, Channel::SosRequests);
        assert_eq!(envelope.event, EventKind::Created);
    }

    #[tokio::test]
    async fn update_patches_only_provided_fields() {
        let (service, broadcaster) = harness();
        let (_, mut rx) = broadcaster.register().await;

        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        let _ = next_envelope(&mut rx).await;

        let patch = CrowdReportPatch {
            severity: Some(Severity::High),
            ..CrowdReportPatch::default()
        };
        let updated = service.update_crowd_report(report.id, &patch).await.unwrap();

        assert_eq!(updated.severity, Severity::High);
        assert_eq!(updated.status, report.status);
        assert_eq!(updated.description, report.description);

        let envelope = next_envelope(&mut rx).await;
        assert_eq!(envelope.event, EventKind::Updated);
    }

    #[tokio::test]
    async fn empty_patch_reads_without_writing_or_publishing() {
        let (service, broadcaster) = harness();
        let (_, mut rx) = broadcaster.register().await;

        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        let _ = next_envelope(&mut rx).await;

        let unchanged = service
            .update_crowd_report(report.id, &CrowdReportPatch::default())
            .await
            .unwrap();

        assert_eq!(unchanged, report);
        assert_eq!(unchanged.updated_at, report.created_at);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn report_status_cannot_move_backward() {
        let (service, _) = harness();
        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        service.resolve_crowd_report(report.id).await.unwrap();

        let patch = CrowdReportPatch {
            status: Some(ReportStatus::Active),
            ..CrowdReportPatch::default()
        };
        let err = service
            .update_crowd_report(report.id, &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn restating_current_status_is_not_a_transition() {
        let (service, _) = harness();
        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();

        let patch = CrowdReportPatch {
            status: Some(ReportStatus::Active),
            ..CrowdReportPatch::default()
        };
        let updated = service.update_crowd_report(report.id, &patch).await.unwrap();
        assert_eq!(updated.status, ReportStatus::Active);
    }

    #[tokio::test]
    async fn resolving_twice_is_a_conflict() {
        let (service, _) = harness();
        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();

        let resolved = service.resolve_crowd_report(report.id).await.unwrap();
        assert_eq!(resolved.status, ReportStatus::Resolved);

        let err = service.resolve_crowd_report(report.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn sos_resolve_can_skip_responding() {
        let (service, _) = harness();
        let request = service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();

        let resolved = service.resolve_sos_request(request.id).await.unwrap();
        assert_eq!(resolved.status, SosStatus::Resolved);
    }

    #[tokio::test]
    async fn sos_transitions_are_forward_only() {
        let (service, _) = harness();
        let request = service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();

        let responding = service.respond_sos_request(request.id).await.unwrap();
        assert_eq!(responding.status, SosStatus::Responding);

        let err = service.respond_sos_request(request.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let backward = SosRequestPatch {
            status: Some(SosStatus::Pending),
            ..SosRequestPatch::default()
        };
        let err = service
            .update_sos_request(request.id, &backward)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn upvotes_accumulate_and_publish() {
        let (service, broadcaster) = harness();
        let (_, mut rx) = broadcaster.register().await;

        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        let _ = next_envelope(&mut rx).await;

        let first = service.upvote_crowd_report(report.id).await.unwrap();
        assert_eq!(first.upvotes, 1);
        let second = service.upvote_crowd_report(report.id).await.unwrap();
        assert_eq!(second.upvotes, 2);

        let envelope = next_envelope(&mut rx).await;
        assert_eq!(envelope.event, EventKind::Updated);
        assert_eq!(
            envelope.data.get("upvotes").and_then(|u| u.as_u64()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn delete_announces_only_the_id() {
        let (service, broadcaster) = harness();
        let (_, mut rx) = broadcaster.register().await;

        let report = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        let _ = next_envelope(&mut rx).await;

        service.delete_crowd_report(report.id).await.unwrap();

        let envelope = next_envelope(&mut rx).await;
        assert_eq!(envelope.event, EventKind::Deleted);
        assert_eq!(envelope.data, serde_json::json!({ "id": report.id }));

        let err = service.get_crowd_report(report.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Report not found")));
    }

    #[tokio::test]
    async fn missing_ids_name_their_entity() {
        let (service, _) = harness();

        let report_err = service
            .get_crowd_report(CrowdReportId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            report_err,
            ServiceError::NotFound("Report not found")
        ));

        let sos_err = service
            .get_sos_request(SosRequestId::new())
            .await
            .unwrap_err();
        assert!(matches!(
            sos_err,
            ServiceError::NotFound("SOS request not found")
        ));
    }

    #[tokio::test]
    async fn nearby_reports_only_active_sorted_nearest_first() {
        let (service, _) = harness();
        let origin = Point::new(30.2672, -97.7431);

        // ~222 m, ~111 m, ~55 m, and ~5.5 km north of the origin.
        let far = service
            .create_crowd_report(report_input(30.2692, -97.7431))
            .await
            .unwrap();
        let near = service
            .create_crowd_report(report_input(30.2682, -97.7431))
            .await
            .unwrap();
        let resolved = service
            .create_crowd_report(report_input(30.2677, -97.7431))
            .await
            .unwrap();
        service.resolve_crowd_report(resolved.id).await.unwrap();
        service
            .create_crowd_report(report_input(30.3172, -97.7431))
            .await
            .unwrap();

        let hits = service.nearby_crowd_reports(origin, None).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits.first().unwrap().record.id, near.id);
        assert_eq!(hits.get(1).unwrap().record.id, far.id);
        assert!(hits.first().unwrap().distance < hits.get(1).unwrap().distance);
    }

    #[tokio::test]
    async fn nearby_sos_covers_pending_and_responding() {
        let (service, _) = harness();
        let origin = Point::new(30.2672, -97.7431);

        let pending = service
            .create_sos_request(sos_input(30.2673, -97.7431))
            .await
            .unwrap();
        let responding = service
            .create_sos_request(sos_input(30.2674, -97.7431))
            .await
            .unwrap();
        service.respond_sos_request(responding.id).await.unwrap();
        let resolved = service
            .create_sos_request(sos_input(30.2675, -97.7431))
            .await
            .unwrap();
        service.resolve_sos_request(resolved.id).await.unwrap();

        let hits = service.nearby_sos_requests(origin, None).await.unwrap();

        let ids: Vec<SosRequestId> = hits.iter().map(|hit| hit.record.id).collect();
        assert!(ids.contains(&pending.id));
        assert!(ids.contains(&responding.id));
        assert!(!ids.contains(&resolved.id));
    }

    #[tokio::test]
    async fn list_preserves_newest_first_when_annotating() {
        let (service, _) = harness();
        let origin = Point::new(30.2672, -97.7431);

        let near = service
            .create_crowd_report(report_input(30.2682, -97.7431))
            .await
            .unwrap();
        let far = service
            .create_crowd_report(report_input(30.2772, -97.7431))
            .await
            .unwrap();

        let filter = CrowdReportFilter {
            origin: Some(origin),
            radius_m: Some(5000.0),
            ..CrowdReportFilter::default()
        };
        let CrowdReportListing::Annotated(hits) = service.list_crowd_reports(filter).await.unwrap()
        else {
            panic!("expected an annotated listing");
        };

        // Newest first even though the newest row is the farther one.
        assert_eq!(hits.len(), 2);
        assert_eq!(hits.first().unwrap().record.id, far.id);
        assert_eq!(hits.get(1).unwrap().record.id, near.id);
        assert!(hits.first().unwrap().distance > hits.get(1).unwrap().distance);

        let tight = CrowdReportFilter {
            origin: Some(origin),
            radius_m: Some(500.0),
            ..CrowdReportFilter::default()
        };
        let CrowdReportListing::Annotated(hits) = service.list_crowd_reports(tight).await.unwrap()
        else {
            panic!("expected an annotated listing");
        };
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().record.id, near.id);
    }

    #[tokio::test]
    async fn list_without_position_is_plain() {
        let (service, _) = harness();
        let first = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        let second = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();

        let CrowdReportListing::Plain(rows) = service
            .list_crowd_reports(CrowdReportFilter::default())
            .await
            .unwrap()
        else {
            panic!("expected a plain listing");
        };

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.first().unwrap().id, second.id);
        assert_eq!(rows.get(1).unwrap().id, first.id);
    }

    #[tokio::test]
    async fn list_honors_filters_and_paging() {
        let (service, _) = harness();
        service
            .create_crowd_report(classified_input(
                ReportType::Mud,
                Severity::Low,
                30.2672,
                -97.7431,
            ))
            .await
            .unwrap();
        let older_high = service
            .create_crowd_report(classified_input(
                ReportType::Obstacle,
                Severity::High,
                30.2672,
                -97.7431,
            ))
            .await
            .unwrap();
        let newer_high = service
            .create_crowd_report(classified_input(
                ReportType::Flooding,
                Severity::High,
                30.2672,
                -97.7431,
            ))
            .await
            .unwrap();

        let page_one = CrowdReportFilter {
            severity: Some(Severity::High),
            limit: Some(1),
            ..CrowdReportFilter::default()
        };
        let CrowdReportListing::Plain(rows) =
            service.list_crowd_reports(page_one).await.unwrap()
        else {
            panic!("expected a plain listing");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().id, newer_high.id);

        let page_two = CrowdReportFilter {
            severity: Some(Severity::High),
            limit: Some(1),
            offset: Some(1),
            ..CrowdReportFilter::default()
        };
        let CrowdReportListing::Plain(rows) =
            service.list_crowd_reports(page_two).await.unwrap()
        else {
            panic!("expected a plain listing");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().id, older_high.id);
    }

    #[tokio::test]
    async fn summary_counts_statuses() {
        let (service, _) = harness();
        for _ in 0..2 {
            service
                .create_crowd_report(report_input(30.2672, -97.7431))
                .await
                .unwrap();
        }
        let resolved = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        service.resolve_crowd_report(resolved.id).await.unwrap();

        service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();
        let responding = service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();
        service.respond_sos_request(responding.id).await.unwrap();
        let closed = service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();
        service.resolve_sos_request(closed.id).await.unwrap();

        let summary = service.summary().await.unwrap();

        assert_eq!(summary.crowd_reports.total, 3);
        assert_eq!(summary.crowd_reports.active, 2);
        assert_eq!(summary.crowd_reports.resolved, 1);
        assert_eq!(summary.sos_requests.total, 3);
        assert_eq!(summary.sos_requests.pending, 1);
        assert_eq!(summary.sos_requests.responding, 1);
        assert_eq!(summary.sos_requests.resolved, 1);
    }

    #[tokio::test]
    async fn crowd_analytics_groups_trends_and_leaderboard() {
        let (service, _) = harness();
        service
            .create_crowd_report(classified_input(
                ReportType::Mud,
                Severity::Low,
                30.2672,
                -97.7431,
            ))
            .await
            .unwrap();
        service
            .create_crowd_report(classified_input(
                ReportType::Mud,
                Severity::Medium,
                30.2672,
                -97.7431,
            ))
            .await
            .unwrap();
        let flooding = service
            .create_crowd_report(classified_input(
                ReportType::Flooding,
                Severity::High,
                30.2672,
                -97.7431,
            ))
            .await
            .unwrap();
        for _ in 0..2 {
            service.upvote_crowd_report(flooding.id).await.unwrap();
        }

        let analytics = service.crowd_report_analytics(None).await.unwrap();

        let top_type = analytics.by_type.first().unwrap();
        assert_eq!(top_type.report_type, ReportType::Mud);
        assert_eq!(top_type.count, 2);

        // Default window, oldest day first, everything created today.
        assert_eq!(analytics.recent_trends.len(), 7);
        assert_eq!(analytics.recent_trends.last().unwrap().count, 3);
        assert_eq!(analytics.recent_trends.first().unwrap().count, 0);

        assert_eq!(
            analytics.top_reports.first().map(|report| report.id),
            Some(flooding.id)
        );
        assert_eq!(analytics.top_reports.len(), 3);
    }

    #[tokio::test]
    async fn sos_analytics_on_an_empty_store() {
        let (service, _) = harness();

        let analytics = service.sos_request_analytics(Some(3)).await.unwrap();

        assert!(analytics.by_type.is_empty());
        assert!(analytics.by_status.is_empty());
        assert_eq!(analytics.recent_trends.len(), 3);
        assert!(analytics.recent_trends.iter().all(|point| point.count == 0));
        assert_eq!(analytics.avg_response_time_minutes, 0);
    }

    #[tokio::test]
    async fn sos_analytics_counts_only_pending_for_the_average() {
        let (service, _) = harness();
        let resolved = service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();
        service.resolve_sos_request(resolved.id).await.unwrap();

        // No pending requests: the average reads zero, not an error.
        let analytics = service.sos_request_analytics(None).await.unwrap();
        assert_eq!(analytics.avg_response_time_minutes, 0);

        let by_status = analytics.by_status.first().unwrap();
        assert_eq!(by_status.status, SosStatus::Resolved);
        assert_eq!(by_status.count, 1);
    }

    #[tokio::test]
    async fn purge_drops_only_stale_resolved_records() {
        let (service, _) = harness();
        let keep = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        let gone = service
            .create_crowd_report(report_input(30.2672, -97.7431))
            .await
            .unwrap();
        service.resolve_crowd_report(gone.id).await.unwrap();
        let sos_gone = service
            .create_sos_request(sos_input(30.2672, -97.7431))
            .await
            .unwrap();
        service.resolve_sos_request(sos_gone.id).await.unwrap();

        // Fresh resolutions survive a 365-day window.
        let counts = service.purge_resolved(365).await.unwrap();
        assert_eq!(counts.total(), 0);

        // A zero-day window purges everything already resolved.
        let counts = service.purge_resolved(0).await.unwrap();
        assert_eq!(counts.crowd_reports, 1);
        assert_eq!(counts.sos_requests, 1);

        assert!(service.get_crowd_report(keep.id).await.is_ok());
        let err = service.get_crowd_report(gone.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
