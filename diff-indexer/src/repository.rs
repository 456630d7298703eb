//! Repository port: file content, diffs and commit history from a VCS
//! backend.
//!
//! The indexer depends on this trait only; concrete VCS clients are
//! injected at construction time. [`FixtureRepository`] is a deterministic
//! in-memory implementation for tests and replay runs.

use std::collections::BTreeMap;
use std::sync::RwLock;
use thiserror::Error;

/// Errors surfaced by repository backends. The indexer converts these into
/// per-file diagnostics; they never abort a whole commit.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested object does not exist at the given revision.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport or backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Adapter providing file content and raw diffs from a VCS backend.
pub trait RepositoryPort: Send + Sync {
    /// Full text content of `path` at `commit_sha`.
    fn get_file(&self, path: &str, commit_sha: &str) -> RepositoryResult<String>;

    /// Unified diff for `path` introduced by `commit_sha`.
    fn get_diff(&self, path: &str, commit_sha: &str) -> RepositoryResult<String>;

    /// All file paths changed by `commit_sha`.
    fn list_changed_files(&self, commit_sha: &str) -> RepositoryResult<Vec<String>>;

    /// Commit SHAs on `branch` within the last `since_days` calendar days,
    /// ordered newest first.
    fn list_commits(&self, branch: &str, since_days: u32) -> RepositoryResult<Vec<String>>;
}

#[derive(Default)]
struct FixtureData {
    /// (path, commit) → file content
    files: BTreeMap<(String, String), String>,
    /// (path, commit) → unified diff
    diffs: BTreeMap<(String, String), String>,
    /// commit → changed paths
    changed: BTreeMap<String, Vec<String>>,
    /// branch → commits, newest first
    commits: BTreeMap<String, Vec<String>>,
}

/// In-memory repository fixture. Seed it with files, diffs and commit
/// lists, then hand it to the indexer as a [`RepositoryPort`].
#[derive(Default)]
pub struct FixtureRepository {
    data: RwLock<FixtureData>,
}

impl FixtureRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_file(&self, path: &str, commit_sha: &str, content: &str) {
        if let Ok(mut d) = self.data.write() {
            d.files
                .insert((path.to_string(), commit_sha.to_string()), content.to_string());
        }
    }

    pub fn put_diff(&self, path: &str, commit_sha: &str, diff: &str) {
        if let Ok(mut d) = self.data.write() {
            d.diffs
                .insert((path.to_string(), commit_sha.to_string()), diff.to_string());
            d.changed
                .entry(commit_sha.to_string())
                .or_default()
                .push(path.to_string());
        }
    }

    pub fn put_commits(&self, branch: &str, commits: Vec<String>) {
        if let Ok(mut d) = self.data.write() {
            d.commits.insert(branch.to_string(), commits);
        }
    }
}

impl RepositoryPort for FixtureRepository {
    fn get_file(&self, path: &str, commit_sha: &str) -> RepositoryResult<String> {
        self.data
            .read()
            .map_err(|_| RepositoryError::Backend("fixture lock poisoned".into()))?
            .files
            .get(&(path.to_string(), commit_sha.to_string()))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("{path}@{commit_sha}")))
    }

    fn get_diff(&self, path: &str, commit_sha: &str) -> RepositoryResult<String> {
        self.data
            .read()
            .map_err(|_| RepositoryError::Backend("fixture lock poisoned".into()))?
            .diffs
            .get(&(path.to_string(), commit_sha.to_string()))
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("diff {path}@{commit_sha}")))
    }

    fn list_changed_files(&self, commit_sha: &str) -> RepositoryResult<Vec<String>> {
        Ok(self
            .data
            .read()
            .map_err(|_| RepositoryError::Backend("fixture lock poisoned".into()))?
            .changed
            .get(commit_sha)
            .cloned()
            .unwrap_or_default())
    }

    fn list_commits(&self, branch: &str, _since_days: u32) -> RepositoryResult<Vec<String>> {
        Ok(self
            .data
            .read()
            .map_err(|_| RepositoryError::Backend("fixture lock poisoned".into()))?
            .commits
            .get(branch)
            .cloned()
            .unwrap_or_default())
    }
}
