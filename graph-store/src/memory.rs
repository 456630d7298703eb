//! Thread-safe in-memory property-graph store.
//!
//! Reference implementation of [`PropertyGraphStore`] used by tests and
//! local investigations. Retrieval ranks nodes by case-insensitive token
//! overlap between the query and the node's property values plus text;
//! deliberately trivial, since no embedding backend is wired here.

use crate::errors::{GraphStoreError, GraphStoreResult};
use crate::port::PropertyGraphStore;
use crate::types::{GraphNode, GraphRelation, sanitize_properties};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

/// In-memory store guarded by `RwLock`s so upserts and queries are safe
/// for concurrent callers.
#[derive(Default)]
pub struct InMemoryGraphStore {
    nodes: RwLock<BTreeMap<String, GraphNode>>,
    relations: RwLock<BTreeMap<(String, String, String), GraphRelation>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.read().map(|n| n.len()).unwrap_or(0)
    }

}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-' && c != '.')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect()
}

fn node_haystack(node: &GraphNode) -> String {
    let mut hay = String::new();
    for value in node.properties.values() {
        match value {
            Value::String(s) => {
                hay.push_str(s);
                hay.push(' ');
            }
            other => {
                hay.push_str(&other.to_string());
                hay.push(' ');
            }
        }
    }
    hay.push_str(&node.text);
    hay
}

impl PropertyGraphStore for InMemoryGraphStore {
    fn upsert_nodes(&self, nodes: Vec<GraphNode>) -> GraphStoreResult<()> {
        let mut guard = self.nodes.write().map_err(|_| GraphStoreError::Poisoned)?;
        for mut node in nodes {
            if node.id.trim().is_empty() {
                return Err(GraphStoreError::EmptyNodeId);
            }
            node.properties = sanitize_properties(&node.properties);
            debug!("graph-store: upsert node {}", node.id);
            guard.insert(node.id.clone(), node);
        }
        Ok(())
    }

    fn upsert_relations(&self, relations: Vec<GraphRelation>) -> GraphStoreResult<()> {
        let mut guard = self
            .relations
            .write()
            .map_err(|_| GraphStoreError::Poisoned)?;
        for mut relation in relations {
            if relation.source_id.is_empty()
                || relation.target_id.is_empty()
                || relation.label.is_empty()
            {
                return Err(GraphStoreError::IncompleteRelation(format!(
                    "{}-[{}]->{}",
                    relation.source_id, relation.label, relation.target_id
                )));
            }
            relation.properties = sanitize_properties(&relation.properties);
            guard.insert(relation.key(), relation);
        }
        Ok(())
    }

    fn get_node(&self, id: &str) -> GraphStoreResult<Option<GraphNode>> {
        let guard = self.nodes.read().map_err(|_| GraphStoreError::Poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn query_by_property(&self, key: &str, value: &Value) -> GraphStoreResult<Vec<GraphNode>> {
        let guard = self.nodes.read().map_err(|_| GraphStoreError::Poisoned)?;
        Ok(guard
            .values()
            .filter(|node| node.properties.get(key) == Some(value))
            .cloned()
            .collect())
    }

    fn relations_from(
        &self,
        source_id: &str,
        label: Option<&str>,
    ) -> GraphStoreResult<Vec<GraphRelation>> {
        let guard = self
            .relations
            .read()
            .map_err(|_| GraphStoreError::Poisoned)?;
        Ok(guard
            .values()
            .filter(|r| r.source_id == source_id && label.is_none_or(|l| r.label == l))
            .cloned()
            .collect())
    }

    fn retrieve(&self, query_text: &str) -> GraphStoreResult<Vec<(GraphNode, f32)>> {
        let query_tokens = tokenize(query_text);
        if query_tokens.is_empty() {
            return Ok(Vec::new());
        }
        let guard = self.nodes.read().map_err(|_| GraphStoreError::Poisoned)?;

        let mut hits: Vec<(GraphNode, f32)> = Vec::new();
        for node in guard.values() {
            let hay = node_haystack(node).to_ascii_lowercase();
            let matched = query_tokens.iter().filter(|t| hay.contains(t.as_str())).count();
            if matched > 0 {
                let score = matched as f32 / query_tokens.len() as f32;
                hits.push((node.clone(), score));
            }
        }
        // Highest score first; ties broken by id so results are stable.
        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn symbol_node(id: &str, path: &str, status: &str) -> GraphNode {
        GraphNode::new(id, "")
            .with_property("file_path", path)
            .with_property("status", status)
    }

    #[test]
    fn upsert_is_idempotent_by_id() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_nodes(vec![symbol_node("n1", "src/a.py", "MODIFIED")])
            .unwrap();
        store
            .upsert_nodes(vec![symbol_node("n1", "src/a.py", "UNCHANGED")])
            .unwrap();

        assert_eq!(store.node_count(), 1);
        let node = store.get_node("n1").unwrap().unwrap();
        assert_eq!(node.prop_str("status"), Some("UNCHANGED"));
    }

    #[test]
    fn upsert_sanitises_nested_properties() {
        let store = InMemoryGraphStore::new();
        let node = GraphNode::new("n1", "").with_property(
            "inclusive_scopes",
            json!([{"name": "Foo", "kind": "class"}]),
        );
        store.upsert_nodes(vec![node]).unwrap();

        let stored = store.get_node("n1").unwrap().unwrap();
        assert!(stored.properties.get("inclusive_scopes").unwrap().is_string());
    }

    #[test]
    fn empty_node_id_is_rejected() {
        let store = InMemoryGraphStore::new();
        let err = store.upsert_nodes(vec![GraphNode::new("  ", "")]);
        assert!(matches!(err, Err(GraphStoreError::EmptyNodeId)));
    }

    #[test]
    fn query_by_property_matches_exactly() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_nodes(vec![
                symbol_node("n1", "src/a.py", "MODIFIED"),
                symbol_node("n2", "src/b.py", "MODIFIED"),
                symbol_node("n3", "src/a.py", "ADDED"),
            ])
            .unwrap();

        let hits = store
            .query_by_property("file_path", &json!("src/a.py"))
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n3"]);
    }

    #[test]
    fn relations_from_filters_by_label() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_relations(vec![
                GraphRelation::new("svc:a", "svc:b", "DEPENDS_ON"),
                GraphRelation::new("svc:a", "svc:b", "OBSERVED_CALL")
                    .with_property("call_count", 10),
                GraphRelation::new("svc:b", "svc:c", "DEPENDS_ON"),
            ])
            .unwrap();

        let deps = store.relations_from("svc:a", Some("DEPENDS_ON")).unwrap();
        assert_eq!(deps.len(), 1);
        let all = store.relations_from("svc:a", None).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn retrieve_ranks_by_token_overlap() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_nodes(vec![
                symbol_node("n1", "src/payment.py", "MODIFIED")
                    .with_property("service", "payment-api"),
                symbol_node("n2", "src/cart.py", "UNCHANGED").with_property("service", "cart-api"),
            ])
            .unwrap();

        let hits = store.retrieve("service payment-api MODIFIED").unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].0.id, "n1");
        assert!(hits[0].1 > hits.last().unwrap().1 || hits.len() == 1);
    }
}
