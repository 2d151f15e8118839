//! Shared type definitions for the Groundwatch incident platform.
//!
//! This crate is the single source of truth for every type that crosses a
//! crate or wire boundary. Types defined here flow downstream to
//! `TypeScript` via `ts-rs` for the live map frontend.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for incident identifiers
//! - [`enums`] -- Enumeration types (report/emergency kinds, statuses,
//!   channels, event kinds)
//! - [`incidents`] -- Crowd report and SOS request records, creation and
//!   patch shapes, and the tagged union over both
//! - [`realtime`] -- Broadcast envelope and WebSocket control frames
//! - [`analytics`] -- Trend series, group counts, and summary payloads

pub mod analytics;
pub mod enums;
pub mod ids;
pub mod incidents;
pub mod realtime;

// Re-export all public types at crate root for convenience.
pub use analytics::{
    CrowdReportAnalytics, CrowdReportTotals, EmergencyTypeCount, ReportStatusCount,
    ReportTypeCount, SeverityCount, SosRequestAnalytics, SosRequestTotals, SosStatusCount,
    SummaryReport, TrendPoint,
};
pub use enums::{Channel, EmergencyType, EventKind, ReportStatus, ReportType, Severity, SosStatus};
pub use ids::{CrowdReportId, SosRequestId};
pub use incidents::{
    CrowdReport, CrowdReportPatch, Incident, NewCrowdReport, NewSosRequest, SosRequest,
    SosRequestPatch,
};
pub use realtime::{BroadcastEnvelope, ClientMessage, ServerMessage};
