//! Incident persistence for the Groundwatch backend.
//!
//! Two interchangeable backends implement the [`IncidentStore`] trait:
//! [`MemoryStore`] for local development and tests, and [`PostgresStore`]
//! for deployment. The service layer only ever sees the trait, so the
//! backend is a config switch, not a code path.
//!
//! # Modules
//!
//! - [`store`] -- The [`IncidentStore`] trait, query types, and purge
//!   accounting.
//! - [`memory`] -- In-process store backed by ordered maps.
//! - [`postgres`] -- `PostgreSQL` store with pooled connections and
//!   embedded migrations.
//! - [`error`] -- Shared error types.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};
pub use store::{CrowdReportQuery, IncidentStore, PurgeCounts, SosRequestQuery};
