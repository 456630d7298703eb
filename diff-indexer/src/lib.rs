//! Differential code indexer.
//!
//! Turns one commit's worth of changed files into a hierarchical symbol
//! graph with per-symbol change status. The pipeline per file:
//!
//! 1. Resolve the service to its repository entry;
//! 2. Fetch the unified diff, detect whole-file addition/deletion;
//! 3. Parse the file into a symbol hierarchy (tree-sitter);
//! 4. Project diff hunks onto symbol line ranges to assign status;
//! 5. Propagate MODIFIED/ADDED status up the containment hierarchy;
//! 6. Assign node text from the final status and upsert nodes plus
//!    CONTAINS edges into the property graph.
//!
//! Deleted files are retained as tombstones so the investigation brain can
//! still query symbols that no longer exist. All recoverable failures are
//! reported as [`IndexingDiagnostic`]s, never as errors to the caller.

pub mod backfill;
pub mod diff;
pub mod errors;
pub mod hierarchy;
pub mod indexer;
pub mod models;
pub mod repository;
pub mod service_repo_map;

pub use backfill::{BackfillOutcome, BackfillRunner};
pub use errors::{IndexerError, IndexerResult};
pub use indexer::DifferentialIndexer;
pub use models::{
    BackfillPolicy, DiagnosticSeverity, DiagnosticStage, DifferentialIndexerRequest,
    IndexingDiagnostic, RepoEntry, SymbolStatus,
};
pub use repository::{FixtureRepository, RepositoryPort};
pub use service_repo_map::{InMemoryServiceRepoMap, ServiceRepoMap};
