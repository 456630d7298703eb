//! Crate-wide error hierarchy for rca-brain.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type BrainResult<T> = Result<T, BrainError>;

/// A stage output violated its declared contract. Fatal to the run.
#[derive(Debug, Error)]
#[error("validation failed in {stage}: {reason}")]
pub struct ValidationError {
    pub stage: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(stage: &'static str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Root error type for the investigation engine.
#[derive(Debug, Error)]
pub enum BrainError {
    /// Incident failed its field constraints before the run started.
    #[error("invalid incident: {0}")]
    InvalidIncident(String),

    /// A stage's output violated its contract.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The run was cancelled or hit its deadline.
    #[error("investigation cancelled")]
    Cancelled,
}
