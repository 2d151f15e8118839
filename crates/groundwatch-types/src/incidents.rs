//! Incident record types: crowd reports, SOS requests, and the tagged
//! union over both.
//!
//! The two variants share a common base shape (id, coordinates, optional
//! description, timestamps) but carry variant-specific classification and
//! status fields, so the allowed status set for each is statically
//! checkable instead of living in one loosely-typed record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{Channel, EmergencyType, ReportStatus, ReportType, Severity, SosStatus};
use crate::ids::{CrowdReportId, SosRequestId};

// ---------------------------------------------------------------------------
// CrowdReport
// ---------------------------------------------------------------------------

/// A crowd-sourced report of a transient ground hazard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrowdReport {
    /// Unique identifier, assigned at creation, immutable.
    pub id: CrowdReportId,
    /// What kind of hazard this is.
    pub report_type: ReportType,
    /// Optional free-text detail, at most 500 characters.
    pub description: Option<String>,
    /// Latitude in degrees, in `[-90, 90]`. Immutable after creation.
    pub latitude: f64,
    /// Longitude in degrees, in `[-180, 180]`. Immutable after creation.
    pub longitude: f64,
    /// How serious the hazard is.
    pub severity: Severity,
    /// Whether the hazard is still present.
    pub status: ReportStatus,
    /// Number of attendees who confirmed the report. Never negative;
    /// incremented only through the dedicated upvote operation.
    pub upvotes: u32,
    /// When the report was created (UTC). Immutable.
    pub created_at: DateTime<Utc>,
    /// When the report was last mutated (UTC). Always `>= created_at`.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by a client to create a [`CrowdReport`].
///
/// Range and length validation happens at the API boundary before this
/// shape is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewCrowdReport {
    /// What kind of hazard this is.
    pub report_type: ReportType,
    /// Optional free-text detail.
    pub description: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Severity; defaults to medium when omitted.
    #[serde(default)]
    pub severity: Severity,
}

/// A partial update to a [`CrowdReport`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CrowdReportPatch {
    /// New status, if changing.
    pub status: Option<ReportStatus>,
    /// New severity, if changing.
    pub severity: Option<Severity>,
    /// Replacement upvote count, if overriding the counter outright.
    pub upvotes: Option<u32>,
    /// Replacement description, if changing.
    pub description: Option<String>,
}

impl CrowdReport {
    /// Build a full record from creation fields, minting a fresh id and
    /// stamping both timestamps with `now`.
    pub fn create(new: NewCrowdReport, now: DateTime<Utc>) -> Self {
        Self {
            id: CrowdReportId::new(),
            report_type: new.report_type,
            description: new.description,
            latitude: new.latitude,
            longitude: new.longitude,
            severity: new.severity,
            status: ReportStatus::default(),
            upvotes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place, refreshing `updated_at`.
    pub fn apply_patch(&mut self, patch: &CrowdReportPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(severity) = patch.severity {
            self.severity = severity;
        }
        if let Some(upvotes) = patch.upvotes {
            self.upvotes = upvotes;
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        self.updated_at = now;
    }
}

impl CrowdReportPatch {
    /// Whether the patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.severity.is_none()
            && self.upvotes.is_none()
            && self.description.is_none()
    }
}

// ---------------------------------------------------------------------------
// SosRequest
// ---------------------------------------------------------------------------

/// An emergency assistance request from an attendee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SosRequest {
    /// Unique identifier, assigned at creation, immutable.
    pub id: SosRequestId,
    /// What kind of emergency this is.
    pub emergency_type: EmergencyType,
    /// Optional free-text detail, at most 500 characters.
    pub description: Option<String>,
    /// Latitude in degrees, in `[-90, 90]`. Immutable after creation.
    pub latitude: f64,
    /// Longitude in degrees, in `[-180, 180]`. Immutable after creation.
    pub longitude: f64,
    /// Where the request is in its response lifecycle.
    pub status: SosStatus,
    /// Optional callback number over the permissive phone charset.
    pub contact_phone: Option<String>,
    /// When the request was created (UTC). Immutable.
    pub created_at: DateTime<Utc>,
    /// When the request was last mutated (UTC). Always `>= created_at`.
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by a client to create an [`SosRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewSosRequest {
    /// What kind of emergency this is.
    pub emergency_type: EmergencyType,
    /// Optional free-text detail.
    pub description: Option<String>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Optional callback number.
    pub contact_phone: Option<String>,
}

/// A partial update to an [`SosRequest`]. `None` fields are left untouched.
///
/// A status change inside a patch still goes through the forward-only
/// transition guard in the service layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SosRequestPatch {
    /// New status, if changing.
    pub status: Option<SosStatus>,
    /// Replacement description, if changing.
    pub description: Option<String>,
    /// Replacement callback number, if changing.
    pub contact_phone: Option<String>,
}

impl SosRequest {
    /// Build a full record from creation fields, minting a fresh id and
    /// stamping both timestamps with `now`.
    pub fn create(new: NewSosRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: SosRequestId::new(),
            emergency_type: new.emergency_type,
            description: new.description,
            latitude: new.latitude,
            longitude: new.longitude,
            status: SosStatus::default(),
            contact_phone: new.contact_phone,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place, refreshing `updated_at`.
    pub fn apply_patch(&mut self, patch: &SosRequestPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(contact_phone) = &patch.contact_phone {
            self.contact_phone = Some(contact_phone.clone());
        }
        self.updated_at = now;
    }
}

impl SosRequestPatch {
    /// Whether the patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.description.is_none() && self.contact_phone.is_none()
    }
}

// ---------------------------------------------------------------------------
// Incident (tagged union)
// ---------------------------------------------------------------------------

/// Either incident variant, tagged with `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Incident {
    /// A crowd-sourced hazard report.
    CrowdReport(CrowdReport),
    /// An emergency assistance request.
    SosRequest(SosRequest),
}

impl Incident {
    /// The record's unique identifier as a bare [`Uuid`].
    pub const fn uuid(&self) -> Uuid {
        match self {
            Self::CrowdReport(r) => r.id.into_inner(),
            Self::SosRequest(s) => s.id.into_inner(),
        }
    }

    /// The broadcast channel this incident's lifecycle events go out on.
    pub const fn channel(&self) -> Channel {
        match self {
            Self::CrowdReport(_) => Channel::CrowdReports,
            Self::SosRequest(_) => Channel::SosRequests,
        }
    }

    /// Latitude in degrees.
    pub const fn latitude(&self) -> f64 {
        match self {
            Self::CrowdReport(r) => r.latitude,
            Self::SosRequest(s) => s.latitude,
        }
    }

    /// Longitude in degrees.
    pub const fn longitude(&self) -> f64 {
        match self {
            Self::CrowdReport(r) => r.longitude,
            Self::SosRequest(s) => s.longitude,
        }
    }

    /// Creation timestamp (UTC).
    pub const fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::CrowdReport(r) => r.created_at,
            Self::SosRequest(s) => s.created_at,
        }
    }
}

impl From<CrowdReport> for Incident {
    fn from(report: CrowdReport) -> Self {
        Self::CrowdReport(report)
    }
}

impl From<SosRequest> for Incident {
    fn from(request: SosRequest) -> Self {
        Self::SosRequest(request)
    }
}
