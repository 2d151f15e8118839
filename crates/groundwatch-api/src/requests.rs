//! Validated request bodies for the mutation endpoints.
//!
//! These mirror the creation/patch shapes in `groundwatch-types` but add
//! the field validation rules the HTTP boundary enforces: coordinate
//! ranges, description length, and the permissive phone charset. A body
//! is validated first and only then converted into the plain shape the
//! service consumes, so nothing past this module sees out-of-range input.
//!
//! Enum-valued fields (report type, severity, statuses) need no rules
//! here; serde already rejects unknown variants at deserialization.

use groundwatch_types::{
    CrowdReportPatch, EmergencyType, NewCrowdReport, NewSosRequest, ReportStatus, ReportType,
    Severity, SosRequestPatch, SosStatus,
};
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Body of `POST /api/crowd-reports`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCrowdReportBody {
    /// What kind of hazard is being reported.
    pub report_type: ReportType,
    /// Optional free-text detail.
    #[validate(length(max = 500, message = "Description must be less than 500 characters"))]
    pub description: Option<String>,
    /// Latitude in degrees.
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    /// Longitude in degrees.
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub longitude: f64,
    /// Severity; medium when omitted.
    #[serde(default)]
    pub severity: Severity,
}

impl CreateCrowdReportBody {
    /// Convert the validated body into the creation shape.
    pub fn into_new(self) -> NewCrowdReport {
        NewCrowdReport {
            report_type: self.report_type,
            description: self.description,
            latitude: self.latitude,
            longitude: self.longitude,
            severity: self.severity,
        }
    }
}

/// Body of `PUT /api/crowd-reports/{id}`. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCrowdReportBody {
    /// New status, if changing.
    pub status: Option<ReportStatus>,
    /// New severity, if changing.
    pub severity: Option<Severity>,
    /// Replacement upvote count, if overriding the counter.
    pub upvotes: Option<u32>,
    /// Replacement description, if changing.
    #[validate(length(max = 500, message = "Description must be less than 500 characters"))]
    pub description: Option<String>,
}

impl UpdateCrowdReportBody {
    /// Convert the validated body into a patch.
    pub fn into_patch(self) -> CrowdReportPatch {
        CrowdReportPatch {
            status: self.status,
            severity: self.severity,
            upvotes: self.upvotes,
            description: self.description,
        }
    }
}

/// Body of `POST /api/sos-requests`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSosRequestBody {
    /// What kind of emergency this is.
    pub emergency_type: EmergencyType,
    /// Optional free-text detail.
    #[validate(length(max = 500, message = "Description must be less than 500 characters"))]
    pub description: Option<String>,
    /// Latitude in degrees.
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,
    /// Longitude in degrees.
    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub longitude: f64,
    /// Optional callback number.
    #[validate(custom(function = phone_charset))]
    pub contact_phone: Option<String>,
}

impl CreateSosRequestBody {
    /// Convert the validated body into the creation shape.
    pub fn into_new(self) -> NewSosRequest {
        NewSosRequest {
            emergency_type: self.emergency_type,
            description: self.description,
            latitude: self.latitude,
            longitude: self.longitude,
            contact_phone: self.contact_phone,
        }
    }
}

/// Body of `PUT /api/sos-requests/{id}`. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSosRequestBody {
    /// New status, if changing.
    pub status: Option<SosStatus>,
    /// Replacement description, if changing.
    #[validate(length(max = 500, message = "Description must be less than 500 characters"))]
    pub description: Option<String>,
    /// Replacement callback number, if changing.
    #[validate(custom(function = phone_charset))]
    pub contact_phone: Option<String>,
}

impl UpdateSosRequestBody {
    /// Convert the validated body into a patch.
    pub fn into_patch(self) -> SosRequestPatch {
        SosRequestPatch {
            status: self.status,
            description: self.description,
            contact_phone: self.contact_phone,
        }
    }
}

/// Accept digits, whitespace, and `+ - ( )`; reject the empty string.
fn phone_charset(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '-' | '+' | '(' | ')'));
    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("phone_charset");
        error.message = Some("Invalid phone number format".into());
        Err(error)
    }
}
