//! Crate-wide error hierarchy for diff-indexer.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Root error type for the diff-indexer crate.
///
/// Per-file indexing failures degrade into diagnostics rather than errors;
/// this enum covers the cases that are a hard stop for the caller (invalid
/// requests, unknown services on onboarding).
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Request failed its field constraints.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Service has no registered repository mapping.
    #[error("service '{0}' is not registered in the service-repo map")]
    ServiceNotRegistered(String),
}
