//! Aggregated analytics payload shapes.
//!
//! These are the response bodies of the analytics endpoints; the numbers
//! behind them come from the store's count/group queries plus the
//! day-bucketing aggregator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EmergencyType, ReportStatus, ReportType, Severity, SosStatus};
use crate::incidents::CrowdReport;

// ---------------------------------------------------------------------------
// Trend series
// ---------------------------------------------------------------------------

/// One calendar-day bucket in a trend series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrendPoint {
    /// The UTC calendar date of the bucket.
    pub date: NaiveDate,
    /// How many records were created on that date.
    pub count: u64,
}

// ---------------------------------------------------------------------------
// Group counts
// ---------------------------------------------------------------------------

/// Count of crowd reports sharing one report type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReportTypeCount {
    /// The grouped report type.
    #[serde(rename = "type")]
    pub report_type: ReportType,
    /// How many reports carry it.
    pub count: u64,
}

/// Count of crowd reports sharing one severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SeverityCount {
    /// The grouped severity.
    pub severity: Severity,
    /// How many reports carry it.
    pub count: u64,
}

/// Count of crowd reports sharing one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ReportStatusCount {
    /// The grouped status.
    pub status: ReportStatus,
    /// How many reports carry it.
    pub count: u64,
}

/// Count of SOS requests sharing one emergency type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EmergencyTypeCount {
    /// The grouped emergency type.
    #[serde(rename = "type")]
    pub emergency_type: EmergencyType,
    /// How many requests carry it.
    pub count: u64,
}

/// Count of SOS requests sharing one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SosStatusCount {
    /// The grouped status.
    pub status: SosStatus,
    /// How many requests carry it.
    pub count: u64,
}

// ---------------------------------------------------------------------------
// Endpoint payloads
// ---------------------------------------------------------------------------

/// Headline status counts for crowd reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrowdReportTotals {
    /// All reports ever stored.
    pub total: u64,
    /// Reports still active.
    pub active: u64,
    /// Reports resolved.
    pub resolved: u64,
}

/// Headline status counts for SOS requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SosRequestTotals {
    /// All requests ever stored.
    pub total: u64,
    /// Requests waiting for a responder.
    pub pending: u64,
    /// Requests with a responder en route.
    pub responding: u64,
    /// Requests closed out.
    pub resolved: u64,
}

/// The `/analytics/summary` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SummaryReport {
    /// Crowd report totals.
    pub crowd_reports: CrowdReportTotals,
    /// SOS request totals.
    pub sos_requests: SosRequestTotals,
}

/// The `/analytics/crowd-reports` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrowdReportAnalytics {
    /// Reports grouped by type, most common first.
    pub by_type: Vec<ReportTypeCount>,
    /// Reports grouped by severity.
    pub by_severity: Vec<SeverityCount>,
    /// Reports grouped by status.
    pub by_status: Vec<ReportStatusCount>,
    /// Daily creation counts over the requested window, oldest first.
    pub recent_trends: Vec<TrendPoint>,
    /// The ten most-upvoted active reports.
    pub top_reports: Vec<CrowdReport>,
}

/// The `/analytics/sos-requests` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SosRequestAnalytics {
    /// Requests grouped by emergency type, most common first.
    pub by_type: Vec<EmergencyTypeCount>,
    /// Requests grouped by status.
    pub by_status: Vec<SosStatusCount>,
    /// Daily creation counts over the requested window, oldest first.
    pub recent_trends: Vec<TrendPoint>,
    /// Mean age in whole minutes of requests still pending; 0 when none
    /// are pending.
    pub avg_response_time_minutes: u64,
}
