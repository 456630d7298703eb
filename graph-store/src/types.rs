//! Node and relation models plus the central property sanitiser.
//!
//! Property graph backends only accept primitive property values (strings,
//! numbers, booleans) or homogeneous lists of primitives. Anything nested
//! (for example a symbol's scope chain, a list of objects) must be
//! JSON-encoded before upsert so no metadata is silently lost.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single property-graph node.
///
/// `text` carries the retrievable body (a patch slice or source slice for
/// code symbols); `properties` carries the queryable metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable node identity. Upserts with the same id overwrite.
    pub id: String,
    /// Retrievable text body; may be empty for structure-only nodes.
    pub text: String,
    /// Queryable metadata. Sanitised on upsert.
    pub properties: BTreeMap<String, Value>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Sets a property and returns `self` for builder-style construction.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the string form of a property, if present and a string.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    /// Returns a numeric property as `f64`, if present and numeric.
    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(Value::as_f64)
    }
}

/// A directed, labelled relation between two nodes.
///
/// Edge labels in this system: `CONTAINS` (code hierarchy), `DEPENDS_ON`
/// (mesh topology) and `OBSERVED_CALL` (mesh telemetry). The latter carries
/// call statistics in `properties`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelation {
    pub source_id: String,
    pub target_id: String,
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl GraphRelation {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            label: label.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Identity key for idempotent upserts.
    pub fn key(&self) -> (String, String, String) {
        (
            self.source_id.clone(),
            self.target_id.clone(),
            self.label.clone(),
        )
    }
}

fn is_primitive(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Returns a copy of `props` safe for property-graph storage.
///
/// Rules, applied per value:
/// - `null` is dropped entirely;
/// - primitives (string, number, bool) pass through;
/// - lists of primitives pass through;
/// - lists with nested or mixed-typed elements, and objects, are
///   JSON-encoded into a single string value.
pub fn sanitize_properties(props: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    let mut clean = BTreeMap::new();
    for (key, value) in props {
        match value {
            Value::Null => continue,
            v if is_primitive(v) => {
                clean.insert(key.clone(), v.clone());
            }
            Value::Array(items) => {
                if items.iter().all(is_primitive) {
                    clean.insert(key.clone(), value.clone());
                } else {
                    clean.insert(key.clone(), Value::String(value.to_string()));
                }
            }
            Value::Object(_) => {
                clean.insert(key.clone(), Value::String(value.to_string()));
            }
            _ => unreachable!("all Value variants handled"),
        }
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitize_keeps_primitives_and_primitive_lists() {
        let mut props = BTreeMap::new();
        props.insert("name".to_string(), json!("charge"));
        props.insert("start_line".to_string(), json!(17));
        props.insert("is_async".to_string(), json!(false));
        props.insert("tags".to_string(), json!(["a", "b"]));

        let clean = sanitize_properties(&props);
        assert_eq!(clean, props);
    }

    #[test]
    fn sanitize_encodes_nested_values_and_drops_nulls() {
        let mut props = BTreeMap::new();
        props.insert(
            "inclusive_scopes".to_string(),
            json!([{"name": "PaymentClient", "kind": "class"}]),
        );
        props.insert("prior_path".to_string(), Value::Null);
        props.insert("mixed".to_string(), json!(["a", 1, {"x": true}]));

        let clean = sanitize_properties(&props);
        assert!(!clean.contains_key("prior_path"));
        let scopes = clean.get("inclusive_scopes").unwrap();
        assert!(scopes.is_string());
        // The encoded form round-trips back into the original structure.
        let decoded: Value = serde_json::from_str(scopes.as_str().unwrap()).unwrap();
        assert_eq!(decoded[0]["name"], "PaymentClient");
        assert!(clean.get("mixed").unwrap().is_string());
    }
}
