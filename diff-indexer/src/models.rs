//! Typed contracts for the differential indexer.

use crate::errors::{IndexerError, IndexerResult};
use serde::{Deserialize, Serialize};

/// Per-symbol change status stored on graph nodes.
///
/// The serialized forms are the literal graph-store vocabulary; downstream
/// queries filter on these exact strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolStatus {
    Added,
    Modified,
    Unchanged,
    Deleted,
    Moved,
}

impl SymbolStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Unchanged => "UNCHANGED",
            Self::Deleted => "DELETED",
            Self::Moved => "MOVED",
        }
    }
}

/// A single service → repository mapping entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    pub repo_url: String,
    pub language: String,
    pub default_branch: String,
}

impl RepoEntry {
    pub fn new(repo_url: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            language: language.into(),
            default_branch: "main".to_string(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }
}

/// Input for a single differential indexing operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DifferentialIndexerRequest {
    pub service: String,
    pub commit_sha: String,
    /// Explicit file list. Empty = auto-detect from the commit.
    #[serde(default)]
    pub file_paths: Vec<String>,
    #[serde(default)]
    pub enable_semantic_delta: bool,
}

impl DifferentialIndexerRequest {
    /// Builds a request, enforcing field constraints: non-empty service,
    /// commit sha of at least 7 characters.
    pub fn new(service: impl Into<String>, commit_sha: impl Into<String>) -> IndexerResult<Self> {
        let service = service.into();
        let commit_sha = commit_sha.into();
        if service.trim().is_empty() {
            return Err(IndexerError::InvalidRequest("service must be non-empty".into()));
        }
        if commit_sha.len() < 7 {
            return Err(IndexerError::InvalidRequest(
                "commit_sha must be at least 7 characters".into(),
            ));
        }
        Ok(Self {
            service,
            commit_sha,
            file_paths: Vec::new(),
            enable_semantic_delta: false,
        })
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.file_paths = files;
        self
    }

    pub fn with_semantic_delta(mut self, enabled: bool) -> Self {
        self.enable_semantic_delta = enabled;
        self
    }
}

/// Controls bounded onboarding backfill scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillPolicy {
    /// Walk back at most this many calendar days.
    pub max_days: u32,
    /// Maximum commits processed per batch.
    pub batch_size: usize,
    pub branch: String,
}

impl Default for BackfillPolicy {
    fn default() -> Self {
        Self {
            max_days: 90,
            batch_size: 20,
            branch: "main".to_string(),
        }
    }
}

impl BackfillPolicy {
    /// Builds a policy, enforcing positive bounds.
    pub fn new(max_days: u32, batch_size: usize, branch: impl Into<String>) -> IndexerResult<Self> {
        if max_days == 0 {
            return Err(IndexerError::InvalidRequest("max_days must be > 0".into()));
        }
        if batch_size == 0 {
            return Err(IndexerError::InvalidRequest("batch_size must be > 0".into()));
        }
        Ok(Self {
            max_days,
            batch_size,
            branch: branch.into(),
        })
    }
}

/// Diagnostic severity. `Warning` degrades to a partial result; `Error`
/// skips the file or commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// The pipeline stage that raised a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    Resolve,
    ListFiles,
    Diff,
    Parse,
    Upsert,
    Backfill,
}

/// Structured error / warning emitted when indexing cannot complete cleanly.
///
/// Diagnostics accumulate across a commit; they are surfaced to the caller
/// alongside the node count and never raised as exceptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingDiagnostic {
    pub severity: DiagnosticSeverity,
    pub stage: DiagnosticStage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
}

impl IndexingDiagnostic {
    pub fn error(stage: DiagnosticStage, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            stage,
            message: message.into(),
            file_path: None,
            commit_sha: None,
        }
    }

    pub fn warning(stage: DiagnosticStage, message: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            stage,
            message: message.into(),
            file_path: None,
            commit_sha: None,
        }
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_commit(mut self, sha: impl Into<String>) -> Self {
        self.commit_sha = Some(sha.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_short_commit_sha() {
        assert!(DifferentialIndexerRequest::new("checkout-api", "abc").is_err());
        assert!(DifferentialIndexerRequest::new("", "abcdef012345").is_err());
        assert!(DifferentialIndexerRequest::new("checkout-api", "abcdef0").is_ok());
    }

    #[test]
    fn backfill_policy_defaults_and_bounds() {
        let policy = BackfillPolicy::default();
        assert_eq!(policy.max_days, 90);
        assert_eq!(policy.batch_size, 20);
        assert_eq!(policy.branch, "main");

        assert!(BackfillPolicy::new(0, 20, "main").is_err());
        assert!(BackfillPolicy::new(30, 0, "main").is_err());
    }

    #[test]
    fn status_serializes_to_graph_vocabulary() {
        let s = serde_json::to_string(&SymbolStatus::Modified).unwrap();
        assert_eq!(s, "\"MODIFIED\"");
        assert_eq!(SymbolStatus::Added.as_str(), "ADDED");
    }
}
