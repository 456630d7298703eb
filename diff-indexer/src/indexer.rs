//! Core differential indexer: parse → project → propagate → upsert.

use crate::diff;
use crate::hierarchy::{self, SymbolRecord};
use crate::models::{
    DiagnosticStage, DifferentialIndexerRequest, IndexingDiagnostic, SymbolStatus,
};
use crate::repository::RepositoryPort;
use crate::service_repo_map::ServiceRepoMap;
use graph_store::{GraphNode, GraphRelation, PropertyGraphStore};
use serde_json::{Value, json};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum ± lines kept in a node's `semantic_delta` property.
const SEMANTIC_DELTA_MAX_LINES: usize = 40;

/// Stable deterministic node identity across upserts.
///
/// SHA1 over `service:path:name:start_line`, truncated to 16 hex chars.
/// Identity, not security; no randomness or wall-clock inputs.
fn node_id(service: &str, file_path: &str, symbol_name: &str, start_line: u32) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{service}:{file_path}:{symbol_name}:{start_line}").as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

/// Working row carried through projection, propagation and upsert.
struct WorkNode {
    record: SymbolRecord,
    status: SymbolStatus,
    semantic_delta: Option<String>,
}

/// Orchestrates the per-commit indexing pipeline and writes the result into
/// the property graph.
///
/// Collaborators are injected: the graph store backend, the service→repo
/// map and the repository port. All per-file failures degrade into
/// diagnostics; the commit continues with the remaining files.
pub struct DifferentialIndexer {
    store: Arc<dyn PropertyGraphStore>,
    service_map: Arc<dyn ServiceRepoMap>,
    repo: Arc<dyn RepositoryPort>,
}

impl DifferentialIndexer {
    pub fn new(
        store: Arc<dyn PropertyGraphStore>,
        service_map: Arc<dyn ServiceRepoMap>,
        repo: Arc<dyn RepositoryPort>,
    ) -> Self {
        Self {
            store,
            service_map,
            repo,
        }
    }

    /// Indexes all changed files for a single commit.
    ///
    /// Returns how many nodes were written plus the diagnostics raised along
    /// the way. Never errors: unrecoverable conditions become `error`
    /// diagnostics and zero the affected scope.
    pub fn index_commit(
        &self,
        request: &DifferentialIndexerRequest,
    ) -> (usize, Vec<IndexingDiagnostic>) {
        let mut diagnostics = Vec::new();

        let repo_entry = match self.service_map.get(&request.service) {
            Ok(entry) => entry,
            Err(err) => {
                diagnostics.push(
                    IndexingDiagnostic::error(DiagnosticStage::Resolve, err.to_string())
                        .with_commit(&request.commit_sha),
                );
                return (0, diagnostics);
            }
        };

        let file_paths = if request.file_paths.is_empty() {
            match self.repo.list_changed_files(&request.commit_sha) {
                Ok(paths) => paths,
                Err(err) => {
                    diagnostics.push(
                        IndexingDiagnostic::error(
                            DiagnosticStage::ListFiles,
                            format!("could not list changed files: {err}"),
                        )
                        .with_commit(&request.commit_sha),
                    );
                    return (0, diagnostics);
                }
            }
        } else {
            request.file_paths.clone()
        };

        info!(
            "indexer: commit {} for service {} ({} files)",
            request.commit_sha,
            request.service,
            file_paths.len()
        );

        let mut total_upserted = 0;
        for path in &file_paths {
            let (upserted, mut file_diags) = self.index_file(
                path,
                &request.service,
                &request.commit_sha,
                &repo_entry.language,
                request.enable_semantic_delta,
            );
            total_upserted += upserted;
            diagnostics.append(&mut file_diags);
        }

        (total_upserted, diagnostics)
    }

    fn index_file(
        &self,
        path: &str,
        service: &str,
        commit_sha: &str,
        language: &str,
        enable_semantic_delta: bool,
    ) -> (usize, Vec<IndexingDiagnostic>) {
        let mut diagnostics = Vec::new();

        // Diff first; it exists even for deletions.
        let raw_diff = match self.repo.get_diff(path, commit_sha) {
            Ok(d) => d,
            Err(err) => {
                diagnostics.push(
                    IndexingDiagnostic::error(DiagnosticStage::Diff, format!("get_diff failed: {err}"))
                        .with_file(path)
                        .with_commit(commit_sha),
                );
                return (0, diagnostics);
            }
        };

        if diff::is_file_deleted(&raw_diff) {
            return self.retain_deleted_nodes(path, service, commit_sha, diagnostics);
        }
        let file_added = diff::is_file_added(&raw_diff);

        let file_content = match self.repo.get_file(path, commit_sha) {
            Ok(c) => c,
            Err(err) => {
                diagnostics.push(
                    IndexingDiagnostic::error(DiagnosticStage::Parse, format!("get_file failed: {err}"))
                        .with_file(path)
                        .with_commit(commit_sha),
                );
                return (0, diagnostics);
            }
        };

        let mut records = hierarchy::parse_hierarchy(&file_content, language, path);
        if records.is_empty() {
            diagnostics.push(
                IndexingDiagnostic::warning(
                    DiagnosticStage::Parse,
                    "hierarchy parser returned 0 symbols; file may be unsupported",
                )
                .with_file(path)
                .with_commit(commit_sha),
            );
            return (0, diagnostics);
        }

        enrich_positions(&mut records, &file_content);

        // Project diff hunk ranges onto symbol line ranges.
        let hunk_ranges = diff::parse_hunks(&raw_diff);
        let mut work: Vec<WorkNode> = records
            .into_iter()
            .map(|record| {
                let status = if file_added {
                    SymbolStatus::Added
                } else if !hunk_ranges.is_empty()
                    && diff::overlaps(record.start_line, record.end_line, &hunk_ranges)
                {
                    SymbolStatus::Modified
                } else {
                    SymbolStatus::Unchanged
                };

                let semantic_delta = (enable_semantic_delta && status == SymbolStatus::Modified)
                    .then(|| summarize_delta(&raw_diff, record.start_line, record.end_line));

                WorkNode {
                    record,
                    status,
                    semantic_delta,
                }
            })
            .collect();

        propagate_status_upward(&mut work);

        // Node text follows the *final* status, after propagation.
        let nodes: Vec<GraphNode> = work
            .iter()
            .map(|w| self.build_graph_node(w, path, service, commit_sha, &raw_diff, &file_content))
            .collect();
        let node_count = nodes.len();

        if let Err(err) = self.store.upsert_nodes(nodes) {
            diagnostics.push(
                IndexingDiagnostic::error(DiagnosticStage::Upsert, format!("graph upsert failed: {err}"))
                    .with_file(path)
                    .with_commit(commit_sha),
            );
            return (0, diagnostics);
        }

        // CONTAINS edges are best-effort; failure never changes node count.
        let relations = build_contains_relations(&work, path, service);
        if let Err(err) = self.store.upsert_relations(relations) {
            warn!("indexer: CONTAINS upsert failed for {path}: {err}");
        }

        debug!("indexer: {path} upserted {node_count} nodes");
        (node_count, diagnostics)
    }

    fn build_graph_node(
        &self,
        work: &WorkNode,
        path: &str,
        service: &str,
        commit_sha: &str,
        raw_diff: &str,
        file_content: &str,
    ) -> GraphNode {
        let record = &work.record;
        let text = match work.status {
            SymbolStatus::Modified => {
                diff::extract_patch_text(raw_diff, record.start_line, record.end_line)
            }
            SymbolStatus::Added => source_slice(file_content, record.start_line, record.end_line),
            _ => String::new(),
        };

        let id = node_id(service, path, &record.name, record.start_line);
        let mut node = GraphNode::new(id, text)
            .with_property("name", record.name.clone())
            .with_property("symbol_kind", record.symbol_kind.clone())
            .with_property("file_path", path)
            .with_property("start_line", record.start_line)
            .with_property("end_line", record.end_line)
            .with_property("status", work.status.as_str())
            .with_property("service", service)
            .with_property("commit_sha", commit_sha);

        if !record.inclusive_scopes.is_empty() {
            let scopes: Vec<Value> = record
                .inclusive_scopes
                .iter()
                .map(|s| json!({"name": s.name, "kind": s.kind}))
                .collect();
            node = node.with_property("inclusive_scopes", Value::Array(scopes));
        }
        if let Some(delta) = &work.semantic_delta {
            if !delta.is_empty() {
                node = node.with_property("semantic_delta", delta.clone());
            }
        }
        node
    }

    /// Marks all existing graph nodes for a deleted file as tombstones.
    ///
    /// Text is cleared, status becomes DELETED, the prior path and fresh
    /// commit provenance are retained, ids are untouched. When the graph
    /// holds nothing for this path yet, a single file-level tombstone is
    /// written instead.
    fn retain_deleted_nodes(
        &self,
        path: &str,
        service: &str,
        commit_sha: &str,
        mut diagnostics: Vec<IndexingDiagnostic>,
    ) -> (usize, Vec<IndexingDiagnostic>) {
        let existing = self
            .store
            .query_by_property("file_path", &json!(path))
            .unwrap_or_default();

        if existing.is_empty() {
            let tombstone = GraphNode::new(node_id(service, path, path, 0), "")
                .with_property("name", path)
                .with_property("symbol_kind", "file")
                .with_property("file_path", path)
                .with_property("prior_path", path)
                .with_property("status", SymbolStatus::Deleted.as_str())
                .with_property("service", service)
                .with_property("commit_sha", commit_sha);

            return match self.store.upsert_nodes(vec![tombstone]) {
                Ok(()) => (1, diagnostics),
                Err(err) => {
                    diagnostics.push(
                        IndexingDiagnostic::error(
                            DiagnosticStage::Upsert,
                            format!("tombstone upsert failed: {err}"),
                        )
                        .with_file(path)
                        .with_commit(commit_sha),
                    );
                    (0, diagnostics)
                }
            };
        }

        let updated: Vec<GraphNode> = existing
            .into_iter()
            .map(|mut node| {
                node.text = String::new();
                let prior = node
                    .prop_str("file_path")
                    .unwrap_or(path)
                    .to_string();
                node.properties
                    .insert("prior_path".to_string(), json!(prior));
                node.properties
                    .insert("status".to_string(), json!(SymbolStatus::Deleted.as_str()));
                node.properties
                    .insert("commit_sha".to_string(), json!(commit_sha));
                node
            })
            .collect();
        let count = updated.len();

        match self.store.upsert_nodes(updated) {
            Ok(()) => {
                info!("indexer: retained {count} deleted nodes for {path}");
                (count, diagnostics)
            }
            Err(err) => {
                diagnostics.push(
                    IndexingDiagnostic::error(
                        DiagnosticStage::Upsert,
                        format!("deletion retention upsert failed: {err}"),
                    )
                    .with_file(path)
                    .with_commit(commit_sha),
                );
                (0, diagnostics)
            }
        }
    }
}

/// Converts byte spans to 1-based inclusive line numbers and surfaces the
/// innermost scope name and kind on each record.
fn enrich_positions(records: &mut [SymbolRecord], file_content: &str) {
    for record in records {
        let start = record.start_byte.min(file_content.len());
        let end = record.end_byte.min(file_content.len());
        record.start_line = count_lines(&file_content[..start]);
        record.end_line = count_lines(&file_content[..end]);

        match record.inclusive_scopes.last() {
            Some(innermost) => {
                record.name = innermost.name.clone();
                record.symbol_kind = innermost.kind.clone();
            }
            None => {
                record.name = "(module)".to_string();
                record.symbol_kind = "module".to_string();
            }
        }
    }
}

fn count_lines(prefix: &str) -> u32 {
    prefix.bytes().filter(|&b| b == b'\n').count() as u32 + 1
}

/// Full source lines for `[start_line, end_line]`, 1-based inclusive.
fn source_slice(file_content: &str, start_line: u32, end_line: u32) -> String {
    let start = start_line.max(1) as usize - 1;
    let take = (end_line.max(start_line) - start_line + 1) as usize;
    file_content
        .lines()
        .skip(start)
        .take(take)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Patch-line extract for a modified symbol, capped to keep graph
/// properties readable.
fn summarize_delta(raw_diff: &str, start_line: u32, end_line: u32) -> String {
    let extract = diff::extract_patch_text(raw_diff, start_line, end_line);
    if extract.is_empty() {
        return extract;
    }
    extract
        .lines()
        .take(SEMANTIC_DELTA_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bubbles MODIFIED/ADDED status from child symbols up to their ancestors.
///
/// A change inside a method is a change within the enclosing class's source
/// range, so every UNCHANGED ancestor on the scope chain is upgraded to
/// MODIFIED. ADDED/DELETED/MOVED ancestors are never demoted. Siblings are
/// untouched; propagation never crosses files (callers work per file).
fn propagate_status_upward(work: &mut [WorkNode]) {
    let index_by_key: BTreeMap<Vec<String>, usize> = work
        .iter()
        .enumerate()
        .map(|(i, w)| (w.record.scope_key(), i))
        .collect();

    let changed_keys: Vec<Vec<String>> = work
        .iter()
        .filter(|w| matches!(w.status, SymbolStatus::Modified | SymbolStatus::Added))
        .map(|w| w.record.scope_key())
        .collect();

    for key in changed_keys {
        for depth in (0..key.len()).rev() {
            let prefix = key[..depth].to_vec();
            if let Some(&idx) = index_by_key.get(&prefix) {
                if work[idx].status == SymbolStatus::Unchanged {
                    work[idx].status = SymbolStatus::Modified;
                }
            }
        }
    }
}

/// Derives CONTAINS edges from scope nesting: a parent→child edge exists
/// iff the parent's scope chain equals the child's chain minus its last
/// element, within the same file.
fn build_contains_relations(work: &[WorkNode], path: &str, service: &str) -> Vec<GraphRelation> {
    let id_by_key: BTreeMap<Vec<String>, String> = work
        .iter()
        .map(|w| {
            (
                w.record.scope_key(),
                node_id(service, path, &w.record.name, w.record.start_line),
            )
        })
        .collect();

    let mut relations = Vec::new();
    for w in work {
        let key = w.record.scope_key();
        if key.is_empty() {
            continue; // module-level symbol has no parent
        }
        let parent_key = key[..key.len() - 1].to_vec();
        let child_id = node_id(service, path, &w.record.name, w.record.start_line);
        if let Some(parent_id) = id_by_key.get(&parent_key) {
            if *parent_id != child_id {
                relations.push(GraphRelation::new(parent_id.clone(), child_id, "CONTAINS"));
            }
        }
    }
    relations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::ScopeEntry;

    #[test]
    fn node_id_is_deterministic_and_short() {
        let a = node_id("checkout-api", "src/payment.py", "charge", 17);
        let b = node_id("checkout-api", "src/payment.py", "charge", 17);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        // Any component shift changes the identity.
        assert_ne!(a, node_id("checkout-api", "src/payment.py", "charge", 18));
        assert_ne!(a, node_id("cart-api", "src/payment.py", "charge", 17));
    }

    #[test]
    fn propagation_upgrades_only_unchanged_ancestors() {
        let mk = |scopes: Vec<ScopeEntry>, status: SymbolStatus| {
            let mut record = SymbolRecord::new(0, 0, scopes);
            record.name = record
                .inclusive_scopes
                .last()
                .map(|s| s.name.clone())
                .unwrap_or_else(|| "(module)".to_string());
            WorkNode {
                record,
                status,
                semantic_delta: None,
            }
        };
        let mut work = vec![
            mk(vec![], SymbolStatus::Unchanged),
            mk(vec![ScopeEntry::new("Added", "class")], SymbolStatus::Added),
            mk(
                vec![
                    ScopeEntry::new("Added", "class"),
                    ScopeEntry::new("inner", "method"),
                ],
                SymbolStatus::Modified,
            ),
            mk(vec![ScopeEntry::new("Other", "class")], SymbolStatus::Unchanged),
        ];

        propagate_status_upward(&mut work);

        assert_eq!(work[0].status, SymbolStatus::Modified); // module upgraded
        assert_eq!(work[1].status, SymbolStatus::Added); // never demoted
        assert_eq!(work[2].status, SymbolStatus::Modified);
        assert_eq!(work[3].status, SymbolStatus::Unchanged); // sibling untouched
    }

    #[test]
    fn source_slice_is_inclusive_one_based() {
        let content = "one\ntwo\nthree\nfour\n";
        assert_eq!(source_slice(content, 2, 3), "two\nthree");
        assert_eq!(source_slice(content, 1, 1), "one");
        // Out-of-range tail is tolerated.
        assert_eq!(source_slice(content, 4, 9), "four");
    }
}
