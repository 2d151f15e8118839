//! Error types for the Groundwatch server binary.
//!
//! [`StartupError`] is the top-level error type that wraps all possible
//! failure modes during server startup.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: groundwatch_core::config::ConfigError,
    },

    /// Incident store initialization failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: groundwatch_db::StoreError,
    },

    /// HTTP server failed to start or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: groundwatch_api::ServerError,
    },
}
