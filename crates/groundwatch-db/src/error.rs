//! Error types for the incident store.
//!
//! Both store backends surface the same [`StoreError`], so callers never
//! branch on which backend is configured. `PostgreSQL` error codes that
//! have a domain meaning (missing row, unique violation) are folded into
//! the matching variant instead of leaking through as raw driver errors.

/// Errors surfaced by incident store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested incident does not exist.
    #[error("incident not found")]
    NotFound,

    /// A write collided with an existing record.
    #[error("conflicting write: {0}")]
    Conflict(String),

    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Database(sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value could not be decoded into its domain type.
    #[error("stored value could not be decoded: {0}")]
    Decode(String),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_owned())
            }
            other => Self::Database(other),
        }
    }
}
