//! The [`IncidentStore`] trait and its query types.
//!
//! The store is a data-access layer only: filtering by indexed fields,
//! ordering, and pagination. Geo radius filtering and analytics
//! aggregation happen above the store, over lists fetched from it, so
//! both backends produce identical results down to tie-breaking.
//!
//! The canonical list order everywhere is newest first: `created_at`
//! descending, then id descending. Aggregation code relies on that order
//! being the same across backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use groundwatch_types::{
    CrowdReport, CrowdReportId, CrowdReportPatch, EmergencyType, ReportStatus, ReportType,
    Severity, SosRequest, SosRequestId, SosRequestPatch, SosStatus,
};

use crate::error::StoreError;

/// Filter, ordering, and pagination for crowd report listings.
///
/// Empty `statuses` means any status. `limit: None` means unbounded,
/// which analytics uses to fetch the full set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrowdReportQuery {
    /// Admissible statuses; empty admits all.
    pub statuses: Vec<ReportStatus>,
    /// Exact severity match, if filtering.
    pub severity: Option<Severity>,
    /// Exact hazard type match, if filtering.
    pub report_type: Option<ReportType>,
    /// Maximum rows returned; `None` is unbounded.
    pub limit: Option<u64>,
    /// Rows skipped from the front of the ordered result.
    pub offset: u64,
}

impl CrowdReportQuery {
    /// Whether a report passes every filter in this query.
    pub fn matches(&self, report: &CrowdReport) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&report.status))
            && self.severity.is_none_or(|severity| report.severity == severity)
            && self
                .report_type
                .is_none_or(|report_type| report.report_type == report_type)
    }
}

/// Filter, ordering, and pagination for SOS request listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SosRequestQuery {
    /// Admissible statuses; empty admits all.
    pub statuses: Vec<SosStatus>,
    /// Exact emergency type match, if filtering.
    pub emergency_type: Option<EmergencyType>,
    /// Maximum rows returned; `None` is unbounded.
    pub limit: Option<u64>,
    /// Rows skipped from the front of the ordered result.
    pub offset: u64,
}

impl SosRequestQuery {
    /// Whether a request passes every filter in this query.
    pub fn matches(&self, request: &SosRequest) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&request.status))
            && self
                .emergency_type
                .is_none_or(|emergency_type| request.emergency_type == emergency_type)
    }
}

/// How many records a retention purge removed, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeCounts {
    /// Resolved crowd reports deleted.
    pub crowd_reports: u64,
    /// Resolved SOS requests deleted.
    pub sos_requests: u64,
}

impl PurgeCounts {
    /// Total records deleted across both tables.
    pub const fn total(self) -> u64 {
        self.crowd_reports.saturating_add(self.sos_requests)
    }
}

/// Persistence operations over both incident tables.
///
/// Implementations must make `upvote_crowd_report` atomic: concurrent
/// upvotes of the same report each land, none lost to read-modify-write
/// races. Status transition rules are enforced by the caller, not here.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Insert a fully-built crowd report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the id already exists.
    async fn insert_crowd_report(&self, report: &CrowdReport) -> Result<(), StoreError>;

    /// Fetch one crowd report by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such report exists.
    async fn get_crowd_report(&self, id: CrowdReportId) -> Result<CrowdReport, StoreError>;

    /// List crowd reports matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend query fails.
    async fn list_crowd_reports(
        &self,
        query: &CrowdReportQuery,
    ) -> Result<Vec<CrowdReport>, StoreError>;

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such report exists.
    async fn update_crowd_report(
        &self,
        id: CrowdReportId,
        patch: &CrowdReportPatch,
        now: DateTime<Utc>,
    ) -> Result<CrowdReport, StoreError>;

    /// Atomically add one upvote and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such report exists.
    async fn upvote_crowd_report(
        &self,
        id: CrowdReportId,
        now: DateTime<Utc>,
    ) -> Result<CrowdReport, StoreError>;

    /// Delete one crowd report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such report exists.
    async fn delete_crowd_report(&self, id: CrowdReportId) -> Result<(), StoreError>;

    /// Insert a fully-built SOS request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the id already exists.
    async fn insert_sos_request(&self, request: &SosRequest) -> Result<(), StoreError>;

    /// Fetch one SOS request by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such request exists.
    async fn get_sos_request(&self, id: SosRequestId) -> Result<SosRequest, StoreError>;

    /// List SOS requests matching `query`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend query fails.
    async fn list_sos_requests(
        &self,
        query: &SosRequestQuery,
    ) -> Result<Vec<SosRequest>, StoreError>;

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such request exists.
    async fn update_sos_request(
        &self,
        id: SosRequestId,
        patch: &SosRequestPatch,
        now: DateTime<Utc>,
    ) -> Result<SosRequest, StoreError>;

    /// Delete one SOS request.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such request exists.
    async fn delete_sos_request(&self, id: SosRequestId) -> Result<(), StoreError>;

    /// Delete resolved incidents last touched before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the backend query fails.
    async fn purge_resolved_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<PurgeCounts, StoreError>;
}
