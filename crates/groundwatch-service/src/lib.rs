//! Incident lifecycle orchestration for the Groundwatch backend.
//!
//! Sits between the HTTP layer and the store: enforces status transition
//! rules, runs geo filtering and analytics aggregation, and publishes a
//! live event after every successful write.
//!
//! # Modules
//!
//! - [`service`] -- [`IncidentService`] and its list filter/result shapes
//! - [`error`] -- [`ServiceError`], the error every operation returns
//! - [`retention`] -- background purge of stale resolved incidents
//!
//! [`IncidentService`]: service::IncidentService
//! [`ServiceError`]: error::ServiceError

pub mod error;
pub mod retention;
pub mod service;

pub use error::ServiceError;
pub use retention::{RetentionHandle, spawn_retention};
pub use service::{
    CrowdReportFilter, CrowdReportListing, DEFAULT_LIST_LIMIT, DEFAULT_NEARBY_RADIUS_M,
    IncidentService, SosRequestFilter, SosRequestListing,
};
