//! Property-graph port for the RCA backend.
//!
//! The differential indexer and the investigation brain both talk to a
//! property graph through the [`PropertyGraphStore`] trait. Backends such as
//! Neo4j or Kuzu live behind this boundary; this crate ships the typed
//! node/relation models, the central property sanitiser, and a thread-safe
//! in-memory implementation used for tests and local runs.
//!
//! Design rules:
//! - Upserts are idempotent: nodes by `id`, relations by
//!   `(source_id, target_id, label)`.
//! - Persisted property values are always JSON scalars; nested or
//!   mixed-typed values are JSON-encoded to strings before they reach a
//!   backend (see [`sanitize_properties`]).
//! - All operations are safe for concurrent callers.

pub mod errors;
pub mod memory;
pub mod port;
pub mod types;

pub use errors::{GraphStoreError, GraphStoreResult};
pub use memory::InMemoryGraphStore;
pub use port::PropertyGraphStore;
pub use types::{GraphNode, GraphRelation, sanitize_properties};
