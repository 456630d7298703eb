//! Crate-wide error hierarchy for graph-store.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GraphStoreResult<T> = Result<T, GraphStoreError>;

/// Root error type for graph-store operations.
#[derive(Debug, Error)]
pub enum GraphStoreError {
    /// A node reached the store without a usable identity.
    #[error("node has an empty id")]
    EmptyNodeId,

    /// A relation is missing one of its endpoints or its label.
    #[error("relation is incomplete: {0}")]
    IncompleteRelation(String),

    /// Shared state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// JSON (de)serialization failure while encoding properties.
    #[error("serde json error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}
