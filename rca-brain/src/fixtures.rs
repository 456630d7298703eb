//! Typed fixture formats for tests and replay runs.
//!
//! Two formats cross the boundary: the mesh-event JSONL stream (parsed in
//! [`crate::mesh`]) and the ground-truth descriptor that accompanies a
//! replay bundle. Load/dump round-trips structurally; generators live
//! outside this system.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Ground-truth metadata for a replay bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub bundle_id: String,
    pub scenario_id: String,
    pub root_cause: String,
    pub trigger: String,
    pub blast_radius: Vec<String>,
    pub expected_first_signal: String,
    pub confidence_target_min: f64,
    pub confidence_target_max: f64,
    pub threshold_default: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_override: Option<f64>,
}

impl GroundTruth {
    /// Loads a ground-truth document from a JSON file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(io::Error::other)
    }

    /// Writes the document as pretty-printed JSON.
    pub fn dump(&self, path: &Path) -> io::Result<()> {
        let raw = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        std::fs::write(path, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GroundTruth {
        GroundTruth {
            bundle_id: "bundle-7".to_string(),
            scenario_id: "timeout_cascade".to_string(),
            root_cause: "payment gateway timeout tightened from 30s to 5s".to_string(),
            trigger: "deploy-1".to_string(),
            blast_radius: vec!["checkout-api".to_string(), "payment-api".to_string()],
            expected_first_signal: "p99 latency step on checkout-api".to_string(),
            confidence_target_min: 0.7,
            confidence_target_max: 0.95,
            threshold_default: 0.8,
            threshold_override: None,
        }
    }

    #[test]
    fn ground_truth_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ground_truth.json");

        let original = sample();
        original.dump(&path).unwrap();
        let reloaded = GroundTruth::load(&path).unwrap();

        assert_eq!(original, reloaded);
    }

    #[test]
    fn threshold_override_survives_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gt.json");

        let mut original = sample();
        original.threshold_override = Some(0.9);
        original.dump(&path).unwrap();

        assert_eq!(GroundTruth::load(&path).unwrap().threshold_override, Some(0.9));
    }
}
