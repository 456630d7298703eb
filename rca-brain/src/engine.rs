//! The investigation engine: an explicit cyclic state machine over the
//! seven stages.
//!
//! Topology: supervisor → mesh_scout → git_scout → metric_analyst →
//! rca_synthesizer → critic, with a conditional edge after the critic:
//! proceed to fix_advisor when the critic score clears the threshold or
//! the iteration budget is spent, otherwise loop back to the supervisor
//! for a refinement pass.
//!
//! Every run persists a report, whatever happened: completed, escalated,
//! failed on a validation contract, or cancelled.

use crate::errors::{BrainError, BrainResult};
use crate::models::{ApprovedIncident, BrainState, RcaReport, RunStatus};
use crate::repository::InMemoryReportRepository;
use crate::stages::{StageContext, StageKind, run_stage};
use crate::validators::validate_stage;
use chrono::Utc;
use graph_store::PropertyGraphStore;
use llm_service::LlmClient;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative cancellation handle checked at every stage boundary.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that trips automatically after `timeout`.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct BrainEngineConfig {
    /// Critic score gate for finishing without another refinement loop.
    pub critic_threshold: f64,
    /// Fix confidence gate for a `completed` terminal status.
    pub fix_confidence_threshold: f64,
    pub max_iterations: u32,
    /// Per-iteration decay applied by the critic's stub scoring.
    pub critic_decay: f64,
    /// When set, every report is also written here as a JSON document.
    pub report_log_path: Option<PathBuf>,
}

impl Default for BrainEngineConfig {
    fn default() -> Self {
        Self {
            critic_threshold: 0.80,
            fix_confidence_threshold: 0.75,
            max_iterations: 3,
            critic_decay: 0.02,
            report_log_path: None,
        }
    }
}

impl BrainEngineConfig {
    /// Default config with the optional `REPORT_LOG_PATH` override applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(path) = std::env::var("REPORT_LOG_PATH") {
            if !path.trim().is_empty() {
                cfg.report_log_path = Some(PathBuf::from(path));
            }
        }
        cfg
    }
}

/// Drives one incident through the stage graph to a durable report.
///
/// Collaborators are injected at construction; the engine holds no global
/// state. One incident → one state → one report.
pub struct BrainEngine {
    repository: Arc<InMemoryReportRepository>,
    config: BrainEngineConfig,
    llm: Option<LlmClient>,
    mesh_graph: Option<Arc<dyn PropertyGraphStore>>,
    code_graph: Option<Arc<dyn PropertyGraphStore>>,
}

impl BrainEngine {
    pub fn new(repository: Arc<InMemoryReportRepository>, config: BrainEngineConfig) -> Self {
        Self {
            repository,
            config,
            llm: None,
            mesh_graph: None,
            code_graph: None,
        }
    }

    pub fn with_llm(mut self, llm: LlmClient) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_mesh_graph(mut self, store: Arc<dyn PropertyGraphStore>) -> Self {
        self.mesh_graph = Some(store);
        self
    }

    pub fn with_code_graph(mut self, store: Arc<dyn PropertyGraphStore>) -> Self {
        self.code_graph = Some(store);
        self
    }

    /// Runs the investigation to completion.
    pub async fn run(&self, incident: ApprovedIncident) -> RcaReport {
        self.run_with_cancel(incident, CancelToken::new()).await
    }

    /// Runs the investigation under a cancellation token. Cancellation
    /// yields a `failed` report with a cancellation marker in `errors`.
    pub async fn run_with_cancel(
        &self,
        incident: ApprovedIncident,
        cancel: CancelToken,
    ) -> RcaReport {
        let mut state = BrainState::new(
            incident,
            self.config.max_iterations,
            self.config.critic_threshold,
        );
        let ctx = StageContext {
            llm: self.llm.as_ref(),
            mesh_graph: self.mesh_graph.as_deref(),
            code_graph: self.code_graph.as_deref(),
            critic_decay: self.config.critic_decay,
        };

        match self.drive(&mut state, &ctx, &cancel).await {
            Ok(()) => {
                let completed = state.critic_score >= self.config.critic_threshold
                    || state.fix_confidence >= self.config.fix_confidence_threshold;
                state.status = if completed {
                    RunStatus::Completed
                } else {
                    RunStatus::Escalated
                };
            }
            Err(err) => {
                state.status = RunStatus::Failed;
                let marker = match err {
                    BrainError::Cancelled => {
                        "cancelled: investigation aborted before completion".to_string()
                    }
                    other => other.to_string(),
                };
                state.errors.push(marker);
            }
        }

        let report = self.build_report(&state);
        info!(
            "engine: incident {} finished with status {:?} (iteration {})",
            report.incident_id, report.status, state.iteration
        );
        self.repository.save(report.clone());

        if let Some(path) = &self.config.report_log_path {
            if let Err(err) = write_report_log(path, &report) {
                warn!("engine: report log write failed for {}: {err}", path.display());
            }
        }
        report
    }

    async fn drive(
        &self,
        state: &mut BrainState,
        ctx: &StageContext<'_>,
        cancel: &CancelToken,
    ) -> BrainResult<()> {
        let mut stage = StageKind::Supervisor;
        loop {
            if cancel.is_cancelled() {
                return Err(BrainError::Cancelled);
            }

            debug!("engine: running stage {}", stage.name());
            run_stage(stage, state, ctx).await;
            validate_stage(stage, state)?;

            stage = match stage {
                StageKind::Supervisor => StageKind::MeshScout,
                StageKind::MeshScout => StageKind::GitScout,
                StageKind::GitScout => StageKind::MetricAnalyst,
                StageKind::MetricAnalyst => StageKind::Synthesizer,
                StageKind::Synthesizer => StageKind::Critic,
                StageKind::Critic => {
                    if state.critic_score >= state.critic_threshold {
                        StageKind::FixAdvisor
                    } else if state.iteration >= state.max_iterations {
                        debug!(
                            "engine: iteration budget spent at score {:.2}, proceeding to fix advisor",
                            state.critic_score
                        );
                        StageKind::FixAdvisor
                    } else {
                        StageKind::Supervisor
                    }
                }
                StageKind::FixAdvisor => return Ok(()),
            };
        }
    }

    fn build_report(&self, state: &BrainState) -> RcaReport {
        let mut metadata = BTreeMap::new();
        metadata.insert("iteration".to_string(), json!(state.iteration));
        metadata.insert("max_iterations".to_string(), json!(state.max_iterations));
        metadata.insert(
            "critic_threshold".to_string(),
            json!(self.config.critic_threshold),
        );
        metadata.insert(
            "fix_confidence_threshold".to_string(),
            json!(self.config.fix_confidence_threshold),
        );
        metadata.insert("critic_decay".to_string(), json!(self.config.critic_decay));
        metadata.insert("llm_enabled".to_string(), json!(self.llm.is_some()));
        metadata.insert("task_plan".to_string(), json!(state.task_plan));
        metadata.insert("mesh_summary".to_string(), json!(state.mesh_summary));
        metadata.insert("git_summary".to_string(), json!(state.git_summary));
        metadata.insert("metrics_summary".to_string(), json!(state.metrics_summary));
        metadata.insert("critic_reasoning".to_string(), json!(state.critic_reasoning));
        metadata.insert("fix_summary".to_string(), json!(state.fix_summary));
        metadata.insert("fix_reasoning".to_string(), json!(state.fix_reasoning));
        metadata.insert("suspect_services".to_string(), json!(state.suspect_services));
        metadata.insert("suspect_edges".to_string(), json!(state.suspect_edges));
        metadata.insert("evidence_refs".to_string(), json!(state.evidence_refs));

        RcaReport {
            incident_id: state.incident.incident_id.clone(),
            status: state.status,
            critic_score: state.critic_score,
            fix_confidence: state.fix_confidence,
            hypotheses: state.hypotheses.clone(),
            errors: state.errors.clone(),
            metadata,
        }
    }
}

/// Writes `{"saved_at": <ISO-8601 UTC>, "report": {...}}` to `path`.
fn write_report_log(path: &std::path::Path, report: &RcaReport) -> std::io::Result<()> {
    let document = json!({
        "saved_at": Utc::now().to_rfc3339(),
        "report": report,
    });
    let raw = serde_json::to_string_pretty(&document).map_err(std::io::Error::other)?;
    std::fs::write(path, raw)
}
