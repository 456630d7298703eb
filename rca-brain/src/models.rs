//! Typed models for investigation runs.

use crate::errors::{BrainError, BrainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// An incident that passed triage and was admitted to the RCA pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedIncident {
    pub incident_id: String,
    pub service: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    /// Freeform evidence bag: log snippets, metric snapshots, a raw
    /// mesh-events JSONL blob, ground truth for replay runs.
    #[serde(default)]
    pub extra_context: BTreeMap<String, Value>,
}

impl ApprovedIncident {
    /// Builds an incident, enforcing field constraints: incident id of at
    /// least 3 characters, service name of at least 2.
    pub fn new(
        incident_id: impl Into<String>,
        service: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> BrainResult<Self> {
        let incident_id = incident_id.into();
        let service = service.into();
        if incident_id.len() < 3 {
            return Err(BrainError::InvalidIncident(
                "incident_id must be at least 3 characters".into(),
            ));
        }
        if service.len() < 2 {
            return Err(BrainError::InvalidIncident(
                "service must be at least 2 characters".into(),
            ));
        }
        Ok(Self {
            incident_id,
            service,
            started_at,
            deployment_id: None,
            extra_context: BTreeMap::new(),
        })
    }

    pub fn with_deployment(mut self, deployment_id: impl Into<String>) -> Self {
        self.deployment_id = Some(deployment_id.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra_context.insert(key.into(), value.into());
        self
    }
}

/// A candidate root cause with bounded confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    pub title: String,
    pub summary: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
}

impl Hypothesis {
    /// Confidence is clamped to [0, 1] on construction.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        confidence: f64,
        evidence_refs: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            confidence: clamp_unit(confidence),
            evidence_refs,
        }
    }
}

/// Run status carried through state and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Escalated,
    Failed,
}

/// Shared investigation state threaded through the stage graph.
///
/// One incident → one state → one report. Stages mutate it in place; the
/// engine dispatcher owns sequencing and validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainState {
    pub incident: ApprovedIncident,
    /// Incremented exactly once per supervisor entry; starts at 0.
    pub iteration: u32,
    pub max_iterations: u32,
    pub critic_threshold: f64,
    /// Insertion-ordered, deduplicated evidence identifiers.
    pub evidence_refs: Vec<String>,
    pub hypotheses: Vec<Hypothesis>,
    pub critic_score: f64,
    pub fix_confidence: f64,
    pub status: RunStatus,
    pub errors: Vec<String>,

    // Per-stage text outputs.
    pub task_plan: String,
    pub mesh_summary: String,
    pub git_summary: String,
    pub metrics_summary: String,
    pub critic_reasoning: String,
    pub fix_summary: String,
    pub fix_reasoning: String,

    /// Services in investigation scope; the incident service is always
    /// first whenever non-empty.
    pub suspect_services: Vec<String>,
    /// Degraded call edges as `"caller->upstream"` strings.
    pub suspect_edges: Vec<String>,
}

impl BrainState {
    pub fn new(incident: ApprovedIncident, max_iterations: u32, critic_threshold: f64) -> Self {
        Self {
            incident,
            iteration: 0,
            max_iterations,
            critic_threshold,
            evidence_refs: Vec::new(),
            hypotheses: Vec::new(),
            critic_score: 0.0,
            fix_confidence: 0.0,
            status: RunStatus::Running,
            errors: Vec::new(),
            task_plan: String::new(),
            mesh_summary: String::new(),
            git_summary: String::new(),
            metrics_summary: String::new(),
            critic_reasoning: String::new(),
            fix_summary: String::new(),
            fix_reasoning: String::new(),
            suspect_services: Vec::new(),
            suspect_edges: Vec::new(),
        }
    }

    /// Appends an evidence ref, preserving first-insertion order and
    /// dropping duplicates.
    pub fn push_evidence(&mut self, evidence_ref: impl Into<String>) {
        let evidence_ref = evidence_ref.into();
        if !self.evidence_refs.contains(&evidence_ref) {
            self.evidence_refs.push(evidence_ref);
        }
    }

    /// Appends a suspect edge string, deduplicated.
    pub fn push_suspect_edge(&mut self, edge: impl Into<String>) {
        let edge = edge.into();
        if !self.suspect_edges.contains(&edge) {
            self.suspect_edges.push(edge);
        }
    }

    /// Rebuilds `suspect_services` so the incident service leads and the
    /// rest keep first-seen order without duplicates.
    pub fn set_suspects(&mut self, suspects: impl IntoIterator<Item = String>) {
        let mut ordered = vec![self.incident.service.clone()];
        for suspect in suspects {
            if !ordered.contains(&suspect) {
                ordered.push(suspect);
            }
        }
        self.suspect_services = ordered;
    }

    pub fn set_critic_score(&mut self, score: f64) {
        self.critic_score = clamp_unit(score);
    }

    pub fn set_fix_confidence(&mut self, confidence: f64) {
        self.fix_confidence = clamp_unit(confidence);
    }

    /// Highest-confidence hypothesis, if any.
    pub fn top_hypothesis(&self) -> Option<&Hypothesis> {
        self.hypotheses
            .iter()
            .max_by(|a, b| a.confidence.partial_cmp(&b.confidence).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Final immutable investigation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RcaReport {
    pub incident_id: String,
    pub status: RunStatus,
    pub critic_score: f64,
    pub fix_confidence: f64,
    /// Ranked most-likely first.
    pub hypotheses: Vec<Hypothesis>,
    pub errors: Vec<String>,
    /// Stage summaries and configured thresholds.
    pub metadata: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn incident() -> ApprovedIncident {
        ApprovedIncident::new(
            "inc-1",
            "checkout-api",
            Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn incident_field_constraints() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap();
        assert!(ApprovedIncident::new("ab", "checkout-api", ts).is_err());
        assert!(ApprovedIncident::new("inc-1", "c", ts).is_err());
        assert!(ApprovedIncident::new("inc-1", "checkout-api", ts).is_ok());
    }

    #[test]
    fn hypothesis_confidence_is_clamped() {
        assert_eq!(Hypothesis::new("t", "s", 1.7, vec![]).confidence, 1.0);
        assert_eq!(Hypothesis::new("t", "s", -0.2, vec![]).confidence, 0.0);
    }

    #[test]
    fn evidence_refs_dedupe_preserving_order() {
        let mut state = BrainState::new(incident(), 3, 0.8);
        state.push_evidence("incident:inc-1");
        state.push_evidence("deploy:deploy-1");
        state.push_evidence("incident:inc-1");
        state.push_evidence("metric:checkout-api:p99");

        assert_eq!(
            state.evidence_refs,
            vec!["incident:inc-1", "deploy:deploy-1", "metric:checkout-api:p99"]
        );
    }

    #[test]
    fn suspects_always_lead_with_incident_service() {
        let mut state = BrainState::new(incident(), 3, 0.8);
        state.set_suspects(vec![
            "payment-api".to_string(),
            "checkout-api".to_string(),
            "payment-api".to_string(),
        ]);
        assert_eq!(state.suspect_services, vec!["checkout-api", "payment-api"]);
    }

    #[test]
    fn scores_clamp_on_assignment() {
        let mut state = BrainState::new(incident(), 3, 0.8);
        state.set_critic_score(1.4);
        state.set_fix_confidence(-0.1);
        assert_eq!(state.critic_score, 1.0);
        assert_eq!(state.fix_confidence, 0.0);
    }
}
