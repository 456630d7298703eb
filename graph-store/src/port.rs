//! The abstract property-graph store contract.

use crate::errors::GraphStoreResult;
use crate::types::{GraphNode, GraphRelation};
use serde_json::Value;

/// Sink/source contract every graph backend implements.
///
/// Implementations must sanitise node and relation properties before
/// persisting them (see [`crate::sanitize_properties`]) and must be safe
/// for concurrent callers: parallel investigations share a single store.
pub trait PropertyGraphStore: Send + Sync {
    /// Idempotent node upsert keyed by `GraphNode::id`. Properties and text
    /// of an existing node are overwritten.
    fn upsert_nodes(&self, nodes: Vec<GraphNode>) -> GraphStoreResult<()>;

    /// Idempotent relation upsert keyed by `(source_id, target_id, label)`.
    fn upsert_relations(&self, relations: Vec<GraphRelation>) -> GraphStoreResult<()>;

    /// Fetches a single node by id.
    fn get_node(&self, id: &str) -> GraphStoreResult<Option<GraphNode>>;

    /// Returns all nodes whose property `key` equals `value` exactly.
    fn query_by_property(&self, key: &str, value: &Value) -> GraphStoreResult<Vec<GraphNode>>;

    /// Returns outgoing relations of `source_id`, optionally restricted to
    /// one label. Used for DEPENDS_ON / OBSERVED_CALL traversal.
    fn relations_from(
        &self,
        source_id: &str,
        label: Option<&str>,
    ) -> GraphStoreResult<Vec<GraphRelation>>;

    /// Ranked retrieval over node text and properties. Backends without
    /// embeddings may rank by plain text match.
    fn retrieve(&self, query_text: &str) -> GraphStoreResult<Vec<(GraphNode, f32)>>;
}
