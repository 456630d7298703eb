//! Investigation brain for automated root-cause analysis.
//!
//! An approved incident enters [`BrainEngine::run`], which drives seven
//! cooperating stages around a shared [`BrainState`]: supervisor,
//! mesh-scout, git-scout, metric-analyst, synthesizer, critic and
//! fix-advisor. The critic gates a bounded refinement loop; the final
//! report carries ranked hypotheses, a critique score and a remediation
//! recommendation, and is persisted on every run.
//!
//! The engine is single-threaded cooperative per incident: stages execute
//! sequentially against the state, suspending only on LLM and graph-store
//! I/O. Parallel incidents each get an independent state; the report
//! repository and the graph stores are the only shared resources.

pub mod engine;
pub mod errors;
pub mod fixtures;
pub mod mesh;
pub mod models;
pub mod repository;
pub mod stages;
pub mod validators;

pub use engine::{BrainEngine, BrainEngineConfig, CancelToken};
pub use errors::{BrainError, BrainResult, ValidationError};
pub use fixtures::GroundTruth;
pub use mesh::MeshEvent;
pub use models::{ApprovedIncident, BrainState, Hypothesis, RcaReport, RunStatus};
pub use repository::InMemoryReportRepository;
pub use stages::{StageContext, StageKind};
