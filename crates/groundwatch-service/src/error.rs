//! Error type for incident lifecycle operations.
//!
//! [`ServiceError`] is what every [`IncidentService`] method returns; the
//! HTTP layer maps each variant onto a status code. Store errors arrive
//! through an explicit per-entity translation (a missing row becomes a
//! [`ServiceError::NotFound`] naming the entity) rather than a blanket
//! `From`, so "Report not found" and "SOS request not found" stay distinct
//! on the wire.
//!
//! [`IncidentService`]: crate::service::IncidentService

use groundwatch_db::StoreError;

/// Errors surfaced by incident lifecycle operations.
///
/// Input validation happens before the service is called, so there is no
/// validation variant here; a request that reaches the service is already
/// well-formed.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(&'static str),

    /// The request is valid but collides with current state, such as a
    /// backward status transition.
    #[error("{0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(StoreError),
}

/// Translate a store error raised by a crowd report operation.
pub(crate) fn report_store_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => ServiceError::NotFound("Report not found"),
        StoreError::Conflict(message) => ServiceError::Conflict(message),
        other => ServiceError::Store(other),
    }
}

/// Translate a store error raised by an SOS request operation.
pub(crate) fn sos_store_error(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => ServiceError::NotFound("SOS request not found"),
        StoreError::Conflict(message) => ServiceError::Conflict(message),
        other => ServiceError::Store(other),
    }
}
