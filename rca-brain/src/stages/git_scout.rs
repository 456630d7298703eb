//! Git scout: characterises change evidence across the suspect scope.
//!
//! Preferred path queries the differential code graph and renders a
//! structured summary from node properties only. No raw diff text reaches
//! the summary: the contract is that `git_summary` never contains
//! unified-diff file-header markers.

use super::{StageContext, query_scopes};
use crate::models::BrainState;
use graph_store::{GraphNode, PropertyGraphStore};
use tracing::warn;

const DELTA_SNIPPET_MAX: usize = 120;
const PATCH_SNIPPET_MAX: usize = 180;

pub async fn run(state: &mut BrainState, ctx: &StageContext<'_>) {
    let graph_context = match ctx.code_graph {
        Some(graph) => collect_graph_context(state, graph),
        None => String::new(),
    };

    if let Some(llm) = ctx.llm {
        match llm.generate(&build_prompt(state, &graph_context)).await {
            Ok(text) if !text.trim().is_empty() => {
                state.git_summary = text;
                return;
            }
            Ok(_) => state.errors.push("git_scout_llm_error: empty completion".to_string()),
            Err(err) => state.errors.push(format!("git_scout_llm_error: {err}")),
        }
    }

    if !graph_context.is_empty() {
        state.git_summary =
            format!("Differential graph nodes across suspect scope:\n{graph_context}");
    } else {
        state.git_summary = stub_summary(state);
    }
}

/// Queries the code graph per suspect service and formats MODIFIED/ADDED
/// symbols. Retrieval failure is non-fatal; the stage degrades to the stub.
fn collect_graph_context(state: &mut BrainState, graph: &dyn PropertyGraphStore) -> String {
    let mut sections: Vec<String> = Vec::new();

    for scope_service in query_scopes(state) {
        let query = format!(
            "service:{scope_service} deployment:{} status:(MODIFIED OR ADDED) incident:{}",
            state.incident.deployment_id.as_deref().unwrap_or("unknown"),
            state.incident.started_at.to_rfc3339(),
        );
        let results = match graph.retrieve(&query) {
            Ok(results) => results,
            Err(err) => {
                warn!("git_scout: graph retrieval failed for {scope_service}: {err}");
                continue;
            }
        };

        let changed: Vec<&GraphNode> = results
            .iter()
            .map(|(node, _)| node)
            .filter(|node| {
                node.prop_str("service") == Some(scope_service.as_str())
                    && matches!(node.prop_str("status"), Some("MODIFIED") | Some("ADDED"))
            })
            .collect();

        let formatted = format_graph_nodes(&changed);
        if !formatted.is_empty() {
            sections.push(format!("Service {scope_service}:\n{formatted}"));
            state.push_evidence(format!("graph:{scope_service}"));
        }
    }

    sections.join("\n\n")
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Renders `[STATUS] kind 'name' at path` lines with a single-line delta
/// snippet, built from node properties only.
fn format_graph_nodes(nodes: &[&GraphNode]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for node in nodes {
        let status = node.prop_str("status").unwrap_or("UNKNOWN");
        let kind = node.prop_str("symbol_kind").unwrap_or("symbol");
        let name = node.prop_str("name").unwrap_or("?");
        let path = node.prop_str("file_path").unwrap_or("?");

        let mut line = format!("  [{status}] {kind} '{name}' at {path}");
        if let Some(delta) = node.prop_str("semantic_delta") {
            let snippet = delta.lines().next().unwrap_or_default();
            if !snippet.is_empty() {
                line.push_str(&format!("\n    Delta: {}", truncate(snippet, DELTA_SNIPPET_MAX)));
            }
        } else if !node.text.trim().is_empty() {
            // First two patch lines, minus anything that looks like a
            // file header, flattened to one line.
            let snippet = node
                .text
                .lines()
                .filter(|l| !l.starts_with("---") && !l.starts_with("+++"))
                .take(2)
                .collect::<Vec<_>>()
                .join(" ");
            if !snippet.is_empty() {
                line.push_str(&format!("\n    Patch: {}", truncate(&snippet, PATCH_SNIPPET_MAX)));
            }
        }
        lines.push(line);
    }
    lines.join("\n")
}

fn build_prompt(state: &BrainState, graph_context: &str) -> String {
    let graph_block = if graph_context.is_empty() {
        String::new()
    } else {
        format!("\n\nDifferential graph context (structured, no raw diff):\n{graph_context}")
    };

    format!(
        "You are a software engineer reviewing a deployment that coincided with a production incident.\n\n\
         Service: {}\n\
         Suspect services in scope: {}\n\
         Incident started: {}\n\
         Deployment ID: {}\n\
         Investigation plan: {}{graph_block}\n\n\
         In 3-5 sentences, describe which categories of code changes in this deployment are most likely to have caused the incident.\n\
         Prioritise: DB schema migrations, connection pool or timeout config changes, dependency version bumps, retry logic, caching changes.\n\
         If no deployment ID is present, state that the incident is likely infrastructure-related rather than code-related.",
        state.incident.service,
        query_scopes(state).join(", "),
        state.incident.started_at.to_rfc3339(),
        state.incident.deployment_id.as_deref().unwrap_or("none"),
        state.task_plan,
    )
}

fn stub_summary(state: &BrainState) -> String {
    match &state.incident.deployment_id {
        Some(id) => format!(
            "Deployment {id} found near the incident window. Review DB migrations, \
             timeout settings, and dependency bumps across suspect services."
        ),
        None => "No deployment linked to this incident. Focus on infrastructure, traffic, \
                 and dependency signals across suspect services."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovedIncident;
    use chrono::{TimeZone, Utc};
    use graph_store::InMemoryGraphStore;

    fn state(deployment: Option<&str>) -> BrainState {
        let mut incident = ApprovedIncident::new(
            "inc-1",
            "checkout-api",
            Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap(),
        )
        .unwrap();
        if let Some(id) = deployment {
            incident = incident.with_deployment(id);
        }
        BrainState::new(incident, 3, 0.8)
    }

    fn code_graph() -> InMemoryGraphStore {
        let store = InMemoryGraphStore::new();
        store
            .upsert_nodes(vec![
                GraphNode::new("n-charge", "-        timeout=30\n+        timeout=5")
                    .with_property("name", "charge")
                    .with_property("symbol_kind", "method")
                    .with_property("file_path", "src/payment_client.py")
                    .with_property("status", "MODIFIED")
                    .with_property("service", "checkout-api")
                    .with_property("semantic_delta", "-        timeout=30\n+        timeout=5"),
                GraphNode::new("n-refund", "")
                    .with_property("name", "refund")
                    .with_property("symbol_kind", "method")
                    .with_property("file_path", "src/payment_client.py")
                    .with_property("status", "UNCHANGED")
                    .with_property("service", "checkout-api"),
            ])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn graph_backed_summary_lists_changed_symbols_only() {
        let store = code_graph();
        let mut state = state(Some("deploy-1"));
        let ctx = StageContext {
            llm: None,
            mesh_graph: None,
            code_graph: Some(&store),
            critic_decay: 0.02,
        };

        run(&mut state, &ctx).await;

        assert!(state.git_summary.contains("[MODIFIED] method 'charge' at src/payment_client.py"));
        assert!(!state.git_summary.contains("refund"));
        assert!(state.evidence_refs.contains(&"graph:checkout-api".to_string()));
        // Contract: no unified-diff file headers in the summary.
        assert!(!state.git_summary.contains("--- a/"));
        assert!(!state.git_summary.contains("+++ b/"));
    }

    #[tokio::test]
    async fn stub_keys_on_deployment_presence() {
        let mut with_deploy = state(Some("deploy-1"));
        let ctx = StageContext {
            llm: None,
            mesh_graph: None,
            code_graph: None,
            critic_decay: 0.02,
        };
        run(&mut with_deploy, &ctx).await;
        assert!(with_deploy.git_summary.contains("deploy-1"));

        let mut without = state(None);
        run(&mut without, &ctx).await;
        assert!(without.git_summary.contains("No deployment linked"));
    }
}
