//! Per-stage output contracts.
//!
//! Each stage's declared output is modelled as a tagged struct with an
//! explicit `validate()`; the engine dispatcher invokes it immediately
//! after the stage returns. A violation is fatal to the run: it becomes a
//! `failed` report rather than polluting later stages with malformed
//! state.

use crate::errors::ValidationError;
use crate::models::{BrainState, Hypothesis};
use crate::stages::StageKind;

fn require_text(
    stage: &'static str,
    field: &str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(stage, format!("{field} must be non-empty")));
    }
    Ok(())
}

fn require_unit_range(
    stage: &'static str,
    field: &str,
    value: f64,
) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(ValidationError::new(
            stage,
            format!("{field} must lie in [0, 1], got {value}"),
        ));
    }
    Ok(())
}

/// Supervisor contract: a plan exists and the evidence trail is anchored.
pub struct SupervisorOutput<'a> {
    pub task_plan: &'a str,
    pub evidence_refs: &'a [String],
}

impl SupervisorOutput<'_> {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("supervisor", "task_plan", self.task_plan)?;
        if self.evidence_refs.is_empty() {
            return Err(ValidationError::new("supervisor", "evidence_refs must be non-empty"));
        }
        Ok(())
    }
}

/// Mesh scout contract: a summary plus a scope led by the incident service.
pub struct MeshScoutOutput<'a> {
    pub mesh_summary: &'a str,
    pub suspect_services: &'a [String],
    pub incident_service: &'a str,
}

impl MeshScoutOutput<'_> {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("mesh_scout", "mesh_summary", self.mesh_summary)?;
        match self.suspect_services.first() {
            Some(first) if first == self.incident_service => Ok(()),
            Some(first) => Err(ValidationError::new(
                "mesh_scout",
                format!("suspect_services must lead with '{}', got '{first}'", self.incident_service),
            )),
            None => Err(ValidationError::new("mesh_scout", "suspect_services must be non-empty")),
        }
    }
}

/// Git scout contract: a summary free of unified-diff file headers.
pub struct GitScoutOutput<'a> {
    pub git_summary: &'a str,
}

impl GitScoutOutput<'_> {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("git_scout", "git_summary", self.git_summary)?;
        if self.git_summary.contains("--- a/") || self.git_summary.contains("+++ b/") {
            return Err(ValidationError::new(
                "git_scout",
                "git_summary must not contain unified-diff file headers",
            ));
        }
        Ok(())
    }
}

/// Metric analyst contract.
pub struct MetricAnalystOutput<'a> {
    pub metrics_summary: &'a str,
    pub evidence_refs: &'a [String],
}

impl MetricAnalystOutput<'_> {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("metric_analyst", "metrics_summary", self.metrics_summary)?;
        if self.evidence_refs.is_empty() {
            return Err(ValidationError::new("metric_analyst", "evidence_refs must be non-empty"));
        }
        Ok(())
    }
}

/// Synthesizer contract: every produced hypothesis is well-formed. An
/// empty list is legal; the critic and fix advisor degrade it to an
/// escalation.
pub struct SynthesizerOutput<'a> {
    pub hypotheses: &'a [Hypothesis],
}

impl SynthesizerOutput<'_> {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for hypothesis in self.hypotheses {
            require_text("rca_synthesizer", "hypothesis.title", &hypothesis.title)?;
            require_text("rca_synthesizer", "hypothesis.summary", &hypothesis.summary)?;
            require_unit_range("rca_synthesizer", "hypothesis.confidence", hypothesis.confidence)?;
        }
        Ok(())
    }
}

/// Critic contract: bounded score; reasoning required whenever any
/// hypothesis was scored.
pub struct CriticOutput<'a> {
    pub critic_score: f64,
    pub critic_reasoning: &'a str,
    pub had_hypotheses: bool,
}

impl CriticOutput<'_> {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_unit_range("critic", "critic_score", self.critic_score)?;
        if self.had_hypotheses {
            require_text("critic", "critic_reasoning", self.critic_reasoning)?;
        }
        Ok(())
    }
}

/// Fix advisor contract.
pub struct FixAdvisorOutput<'a> {
    pub fix_summary: &'a str,
    pub fix_confidence: f64,
    pub fix_reasoning: &'a str,
}

impl FixAdvisorOutput<'_> {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("fix_advisor", "fix_summary", self.fix_summary)?;
        require_unit_range("fix_advisor", "fix_confidence", self.fix_confidence)?;
        require_text("fix_advisor", "fix_reasoning", self.fix_reasoning)?;
        Ok(())
    }
}

/// Applies the contract for the stage that just wrote to `state`.
pub fn validate_stage(kind: StageKind, state: &BrainState) -> Result<(), ValidationError> {
    match kind {
        StageKind::Supervisor => SupervisorOutput {
            task_plan: &state.task_plan,
            evidence_refs: &state.evidence_refs,
        }
        .validate(),
        StageKind::MeshScout => MeshScoutOutput {
            mesh_summary: &state.mesh_summary,
            suspect_services: &state.suspect_services,
            incident_service: &state.incident.service,
        }
        .validate(),
        StageKind::GitScout => GitScoutOutput {
            git_summary: &state.git_summary,
        }
        .validate(),
        StageKind::MetricAnalyst => MetricAnalystOutput {
            metrics_summary: &state.metrics_summary,
            evidence_refs: &state.evidence_refs,
        }
        .validate(),
        StageKind::Synthesizer => SynthesizerOutput {
            hypotheses: &state.hypotheses,
        }
        .validate(),
        StageKind::Critic => CriticOutput {
            critic_score: state.critic_score,
            critic_reasoning: &state.critic_reasoning,
            had_hypotheses: !state.hypotheses.is_empty(),
        }
        .validate(),
        StageKind::FixAdvisor => FixAdvisorOutput {
            fix_summary: &state.fix_summary,
            fix_confidence: state.fix_confidence,
            fix_reasoning: &state.fix_reasoning,
        }
        .validate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_rejects_empty_plan() {
        let refs = vec!["incident:inc-1".to_string()];
        assert!(SupervisorOutput { task_plan: "  ", evidence_refs: &refs }.validate().is_err());
        assert!(SupervisorOutput { task_plan: "plan", evidence_refs: &[] }.validate().is_err());
        assert!(SupervisorOutput { task_plan: "plan", evidence_refs: &refs }.validate().is_ok());
    }

    #[test]
    fn mesh_scout_requires_incident_service_first() {
        let suspects = vec!["payment-api".to_string()];
        let out = MeshScoutOutput {
            mesh_summary: "summary",
            suspect_services: &suspects,
            incident_service: "checkout-api",
        };
        assert!(out.validate().is_err());
    }

    #[test]
    fn git_scout_rejects_diff_headers() {
        let out = GitScoutOutput {
            git_summary: "--- a/src/x.py changed",
        };
        assert!(out.validate().is_err());
        assert!(GitScoutOutput { git_summary: "clean summary" }.validate().is_ok());
    }

    #[test]
    fn critic_reasoning_optional_without_hypotheses() {
        assert!(CriticOutput {
            critic_score: 0.0,
            critic_reasoning: "",
            had_hypotheses: false
        }
        .validate()
        .is_ok());
        assert!(CriticOutput {
            critic_score: 0.5,
            critic_reasoning: "",
            had_hypotheses: true
        }
        .validate()
        .is_err());
        assert!(CriticOutput {
            critic_score: 1.2,
            critic_reasoning: "r",
            had_hypotheses: true
        }
        .validate()
        .is_err());
    }

    #[test]
    fn synthesizer_bounds_confidence() {
        let hypotheses = vec![Hypothesis {
            title: "t".into(),
            summary: "s".into(),
            confidence: 1.5, // constructed raw to bypass the clamping ctor
            evidence_refs: vec![],
        }];
        assert!(SynthesizerOutput { hypotheses: &hypotheses }.validate().is_err());
    }
}
