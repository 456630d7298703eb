//! Bounded commit-history backfill for newly onboarded services.

use crate::errors::{IndexerError, IndexerResult};
use crate::indexer::DifferentialIndexer;
use crate::models::{BackfillPolicy, DiagnosticStage, DifferentialIndexerRequest, IndexingDiagnostic};
use crate::repository::RepositoryPort;
use crate::service_repo_map::ServiceRepoMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of one backfill run.
#[derive(Debug)]
pub struct BackfillOutcome {
    pub commits_processed: usize,
    pub nodes_upserted: usize,
    pub diagnostics: Vec<IndexingDiagnostic>,
}

/// Walks a service's recent commit history through the indexer.
///
/// Commits are fetched for the policy branch within `max_days` and
/// processed in `batch_size` chunks. Batches run sequentially: upsert
/// order matters for status propagation across commits.
pub struct BackfillRunner {
    indexer: Arc<DifferentialIndexer>,
    service_map: Arc<dyn ServiceRepoMap>,
    repo: Arc<dyn RepositoryPort>,
}

impl BackfillRunner {
    pub fn new(
        indexer: Arc<DifferentialIndexer>,
        service_map: Arc<dyn ServiceRepoMap>,
        repo: Arc<dyn RepositoryPort>,
    ) -> Self {
        Self {
            indexer,
            service_map,
            repo,
        }
    }

    /// Executes backfill for `service` under `policy`.
    ///
    /// An unregistered service or a commit-listing failure yields an
    /// `error/backfill` diagnostic with zero work done; an empty commit
    /// window yields a single `warning/backfill`.
    pub fn run(&self, service: &str, policy: &BackfillPolicy) -> BackfillOutcome {
        let mut diagnostics = Vec::new();

        if !self.service_map.has(service) {
            diagnostics.push(IndexingDiagnostic::error(
                DiagnosticStage::Backfill,
                format!("service '{service}' is not registered; register it before backfill"),
            ));
            return BackfillOutcome {
                commits_processed: 0,
                nodes_upserted: 0,
                diagnostics,
            };
        }

        let commit_shas = match self.repo.list_commits(&policy.branch, policy.max_days) {
            Ok(shas) => shas,
            Err(err) => {
                diagnostics.push(IndexingDiagnostic::error(
                    DiagnosticStage::Backfill,
                    format!("list_commits failed: {err}"),
                ));
                return BackfillOutcome {
                    commits_processed: 0,
                    nodes_upserted: 0,
                    diagnostics,
                };
            }
        };

        if commit_shas.is_empty() {
            warn!("backfill: no commits within {} days on '{}'", policy.max_days, policy.branch);
            diagnostics.push(IndexingDiagnostic::warning(
                DiagnosticStage::Backfill,
                format!(
                    "no commits found within {} days on branch '{}' for service '{service}'",
                    policy.max_days, policy.branch
                ),
            ));
            return BackfillOutcome {
                commits_processed: 0,
                nodes_upserted: 0,
                diagnostics,
            };
        }

        let mut commits_processed = 0;
        let mut nodes_upserted = 0;

        for batch in commit_shas.chunks(policy.batch_size) {
            info!("backfill: processing batch of {} commits for {service}", batch.len());
            for sha in batch {
                let request = match DifferentialIndexerRequest::new(service, sha.clone()) {
                    Ok(r) => r,
                    Err(err) => {
                        diagnostics.push(IndexingDiagnostic::error(
                            DiagnosticStage::Backfill,
                            format!("skipping commit '{sha}': {err}"),
                        ));
                        continue;
                    }
                };
                let (upserted, mut commit_diags) = self.indexer.index_commit(&request);
                nodes_upserted += upserted;
                commits_processed += 1;
                diagnostics.append(&mut commit_diags);
            }
        }

        BackfillOutcome {
            commits_processed,
            nodes_upserted,
            diagnostics,
        }
    }

    /// Convenience wrapper for onboarding: fails fast with a caller-facing
    /// error when the service is unknown, then backfills.
    pub fn onboard_service(
        &self,
        service: &str,
        policy: &BackfillPolicy,
    ) -> IndexerResult<BackfillOutcome> {
        if !self.service_map.has(service) {
            return Err(IndexerError::ServiceNotRegistered(service.to_string()));
        }
        Ok(self.run(service, policy))
    }
}
