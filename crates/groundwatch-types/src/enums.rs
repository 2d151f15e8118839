//! Enumeration types for the Groundwatch incident platform.
//!
//! Wire values are lowercase/snake_case to match the JSON surface consumed
//! by the map frontend; broadcast channels use kebab-case.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Crowd report enums
// ---------------------------------------------------------------------------

/// The kind of ground-truth hazard a crowd report describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// Muddy or waterlogged ground.
    Mud,
    /// Dangerously dense crowd.
    CrowdDense,
    /// A physical obstacle on a path.
    Obstacle,
    /// Standing or rising water.
    Flooding,
    /// Uneven or hazardous terrain.
    UnevenTerrain,
    /// A path that is fully blocked.
    BlockedPath,
    /// Anything that fits no other category.
    Other,
}

/// How serious a reported hazard is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor inconvenience.
    Low,
    /// Worth routing around.
    #[default]
    Medium,
    /// Dangerous, avoid the area.
    High,
}

/// Lifecycle status of a crowd report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// The hazard is still present.
    #[default]
    Active,
    /// The hazard has been cleared or has expired.
    Resolved,
}

impl ReportStatus {
    /// Whether moving from `self` to `next` is a valid forward transition.
    ///
    /// Reports only move `active -> resolved`; same-state and backward
    /// moves are rejected.
    pub const fn allows_transition_to(self, next: Self) -> bool {
        matches!((self, next), (Self::Active, Self::Resolved))
    }
}

impl fmt::Display for ReportStatus {
    /// Prints the wire name, matching the serialized form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// SOS request enums
// ---------------------------------------------------------------------------

/// The kind of emergency an SOS request signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum EmergencyType {
    /// Medical attention needed.
    Medical,
    /// Panic attack or acute anxiety.
    PanicAttack,
    /// Dehydration or heat exhaustion.
    Dehydration,
    /// Lost and unable to find the way back.
    Lost,
    /// Feeling unsafe or threatened.
    FeelingUnsafe,
    /// Accessibility assistance needed.
    AccessibilityHelp,
    /// Anything that fits no other category.
    Other,
}

/// Lifecycle status of an SOS request.
///
/// Transitions are forward-only. `pending -> responding` and
/// `responding -> resolved` are the normal path; `pending -> resolved`
/// is also accepted because a responder can close out a request they
/// never formally marked as in-progress. Backward and same-state
/// transitions are rejected.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum SosStatus {
    /// Waiting for a responder.
    #[default]
    Pending,
    /// A responder is on the way or on site.
    Responding,
    /// The request has been closed out.
    Resolved,
}

impl SosStatus {
    /// Whether moving from `self` to `next` is a valid forward transition.
    pub const fn allows_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Responding)
                | (Self::Pending, Self::Resolved)
                | (Self::Responding, Self::Resolved)
        )
    }
}

impl fmt::Display for SosStatus {
    /// Prints the wire name, matching the serialized form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Responding => "responding",
            Self::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Broadcast enums
// ---------------------------------------------------------------------------

/// A named broadcast topic that live connections can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    /// Crowd report lifecycle events.
    CrowdReports,
    /// SOS request lifecycle events.
    SosRequests,
}

/// What happened to the record carried in a broadcast envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// The record was just persisted.
    Created,
    /// One or more fields of the record changed.
    Updated,
    /// The record was removed; the payload carries only its id.
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(value: &impl Serialize) -> String {
        serde_json::to_string(value).unwrap_or_default()
    }

    #[test]
    fn report_type_wire_values_are_snake_case() {
        assert_eq!(wire(&ReportType::CrowdDense), "\"crowd_dense\"");
        assert_eq!(wire(&ReportType::UnevenTerrain), "\"uneven_terrain\"");
        assert_eq!(wire(&ReportType::Mud), "\"mud\"");
    }

    #[test]
    fn channel_wire_values_are_kebab_case() {
        assert_eq!(wire(&Channel::CrowdReports), "\"crowd-reports\"");
        assert_eq!(wire(&Channel::SosRequests), "\"sos-requests\"");
    }

    #[test]
    fn status_defaults() {
        assert_eq!(ReportStatus::default(), ReportStatus::Active);
        assert_eq!(SosStatus::default(), SosStatus::Pending);
        assert_eq!(Severity::default(), Severity::Medium);
    }

    #[test]
    fn sos_forward_transitions_allowed() {
        assert!(SosStatus::Pending.allows_transition_to(SosStatus::Responding));
        assert!(SosStatus::Responding.allows_transition_to(SosStatus::Resolved));
        // Skip-ahead is an accepted entry point.
        assert!(SosStatus::Pending.allows_transition_to(SosStatus::Resolved));
    }

    #[test]
    fn sos_backward_and_same_state_rejected() {
        assert!(!SosStatus::Resolved.allows_transition_to(SosStatus::Pending));
        assert!(!SosStatus::Resolved.allows_transition_to(SosStatus::Responding));
        assert!(!SosStatus::Responding.allows_transition_to(SosStatus::Pending));
        assert!(!SosStatus::Pending.allows_transition_to(SosStatus::Pending));
        assert!(!SosStatus::Resolved.allows_transition_to(SosStatus::Resolved));
    }

    #[test]
    fn report_transitions() {
        assert!(ReportStatus::Active.allows_transition_to(ReportStatus::Resolved));
        assert!(!ReportStatus::Resolved.allows_transition_to(ReportStatus::Active));
        assert!(!ReportStatus::Active.allows_transition_to(ReportStatus::Active));
    }

    #[test]
    fn emergency_type_roundtrip() {
        let parsed: EmergencyType =
            serde_json::from_str("\"accessibility_help\"").unwrap_or(EmergencyType::Other);
        assert_eq!(parsed, EmergencyType::AccessibilityHelp);
    }
}
