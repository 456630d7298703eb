//! The seven investigator stages and their dispatch table.
//!
//! Each stage is a plain `async fn run(&mut BrainState, &StageContext)`.
//! Stages never fail: every LLM call has a deterministic stub fallback and
//! every parse error is recorded into `state.errors` with a stage prefix.
//! Contract enforcement lives in the validators, invoked by the engine
//! right after each stage returns.

pub mod critic;
pub mod fix_advisor;
pub mod git_scout;
pub mod mesh_scout;
pub mod metric_analyst;
pub mod supervisor;
pub mod synthesizer;

use crate::models::BrainState;
use graph_store::PropertyGraphStore;
use llm_service::LlmClient;

/// Stage identity used by the engine's explicit state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Supervisor,
    MeshScout,
    GitScout,
    MetricAnalyst,
    Synthesizer,
    Critic,
    FixAdvisor,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Supervisor => "supervisor",
            Self::MeshScout => "mesh_scout",
            Self::GitScout => "git_scout",
            Self::MetricAnalyst => "metric_analyst",
            Self::Synthesizer => "rca_synthesizer",
            Self::Critic => "critic",
            Self::FixAdvisor => "fix_advisor",
        }
    }
}

/// Collaborators handed to every stage. No ambient globals: the engine
/// builds one context per run from its injected ports.
pub struct StageContext<'a> {
    pub llm: Option<&'a LlmClient>,
    /// Service-mesh topology/telemetry graph, populated out-of-band.
    pub mesh_graph: Option<&'a dyn PropertyGraphStore>,
    /// Differential code graph maintained by the indexer.
    pub code_graph: Option<&'a dyn PropertyGraphStore>,
    /// Per-iteration decay applied by the critic's stub scoring.
    pub critic_decay: f64,
}

/// Runs one stage against the shared state.
pub async fn run_stage(kind: StageKind, state: &mut BrainState, ctx: &StageContext<'_>) {
    match kind {
        StageKind::Supervisor => supervisor::run(state, ctx).await,
        StageKind::MeshScout => mesh_scout::run(state, ctx).await,
        StageKind::GitScout => git_scout::run(state, ctx).await,
        StageKind::MetricAnalyst => metric_analyst::run(state, ctx).await,
        StageKind::Synthesizer => synthesizer::run(state, ctx).await,
        StageKind::Critic => critic::run(state, ctx).await,
        StageKind::FixAdvisor => fix_advisor::run(state, ctx).await,
    }
}

/// Services in the current investigation scope, never empty.
pub(crate) fn query_scopes(state: &BrainState) -> Vec<String> {
    let mut scopes: Vec<String> = state
        .suspect_services
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if scopes.is_empty() {
        scopes.push(state.incident.service.clone());
    }
    scopes
}
