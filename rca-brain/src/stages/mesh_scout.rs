//! Mesh scout: ranks degraded upstream dependencies of the incident
//! service.
//!
//! Primary strategy traverses the mesh graph store: DEPENDS_ON edges up to
//! two hops from the incident service, joined with OBSERVED_CALL telemetry
//! (call/error counts and latency). Falls back to raw mesh events from the
//! incident bundle when no graph is wired or the service is unknown to it.
//!
//! Runs before git_scout on purpose: it widens `suspect_services` so the
//! code graph is queried for the right services, not only the trigger.

use super::StageContext;
use crate::mesh::find_suspects_from_events;
use crate::models::BrainState;
use graph_store::{GraphRelation, GraphStoreResult, PropertyGraphStore};
use serde_json::json;
use tracing::{debug, warn};

/// Weight of the error rate against normalised latency in the degradation
/// score.
const ERROR_RATE_WEIGHT: f64 = 10.0;
const LATENCY_NORMALISER_MS: f64 = 100.0;

pub async fn run(state: &mut BrainState, ctx: &StageContext<'_>) {
    if let Some(graph) = ctx.mesh_graph {
        match graph_strategy(state, graph) {
            Ok(true) => return,
            Ok(false) => debug!(
                "mesh_scout: '{}' not present in mesh graph, trying raw events",
                state.incident.service
            ),
            Err(err) => warn!("mesh_scout: graph traversal failed ({err}), trying raw events"),
        }
    }
    raw_event_fallback(state);
}

fn observed_stats(rel: &GraphRelation) -> (f64, f64, f64, f64) {
    let get = |key: &str| rel.properties.get(key).and_then(|v| v.as_f64()).unwrap_or(0.0);
    (
        get("call_count"),
        get("error_count"),
        get("avg_latency_ms"),
        get("p99_latency_ms"),
    )
}

/// Returns `Ok(true)` when the graph strategy produced a result (including
/// "no dependencies"), `Ok(false)` when the incident service is unknown to
/// the mesh graph.
fn graph_strategy(state: &mut BrainState, graph: &dyn PropertyGraphStore) -> GraphStoreResult<bool> {
    let service = state.incident.service.clone();
    let trigger_nodes = graph.query_by_property("name", &json!(service))?;
    let Some(trigger) = trigger_nodes.into_iter().next() else {
        return Ok(false);
    };

    // DEPENDS_ON reachability, up to two hops, discovery order preserved.
    let mut dependency_ids: Vec<String> = Vec::new();
    let mut frontier = vec![trigger.id.clone()];
    for _hop in 0..2 {
        let mut next = Vec::new();
        for id in &frontier {
            for rel in graph.relations_from(id, Some("DEPENDS_ON"))? {
                if rel.target_id != trigger.id && !dependency_ids.contains(&rel.target_id) {
                    dependency_ids.push(rel.target_id.clone());
                    next.push(rel.target_id);
                }
            }
        }
        frontier = next;
    }

    if dependency_ids.is_empty() {
        state.set_suspects(Vec::new());
        state.mesh_summary = format!("No dependencies found for '{service}' in mesh graph.");
        return Ok(true);
    }

    let observed_calls = graph.relations_from(&trigger.id, Some("OBSERVED_CALL"))?;

    let mut observed: Vec<(String, f64)> = Vec::new();
    let mut arch_only: Vec<String> = Vec::new();
    let mut summary_lines: Vec<String> = Vec::new();

    for dep_id in &dependency_ids {
        let Some(dep) = graph.get_node(dep_id)? else {
            continue;
        };
        let Some(name) = dep.prop_str("name").map(str::to_string) else {
            continue;
        };

        let stats = observed_calls
            .iter()
            .find(|rel| &rel.target_id == dep_id)
            .map(observed_stats);

        match stats {
            Some((call_count, error_count, avg_latency, p99_latency)) if call_count > 0.0 => {
                let err_rate = error_count / call_count;
                let score = err_rate * ERROR_RATE_WEIGHT + avg_latency / LATENCY_NORMALISER_MS;
                summary_lines.push(format!(
                    "  {name}: {call_count:.0} calls, {error_count:.0} errors ({:.0}% err rate), avg {avg_latency:.0}ms, p99 {p99_latency:.0}ms",
                    err_rate * 100.0
                ));
                state.push_evidence(format!("mesh:observed:{name}"));
                observed.push((name, score));
            }
            _ => {
                summary_lines.push(format!(
                    "  {name}: architecture dependency (no observed calls in this scenario)"
                ));
                state.push_evidence(format!("mesh:depends_on:{name}"));
                arch_only.push(name);
            }
        }
    }

    observed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let ranked: Vec<String> = observed.into_iter().map(|(name, _)| name).collect();

    for upstream in &ranked {
        state.push_suspect_edge(format!("{service}->{upstream}"));
    }
    state.set_suspects(ranked.iter().chain(arch_only.iter()).cloned());

    state.mesh_summary = format!(
        "Mesh graph traversal from '{service}' ({} observed degraded, {} arch-only):\n{}",
        ranked.len(),
        arch_only.len(),
        summary_lines.join("\n")
    );
    Ok(true)
}

fn raw_event_fallback(state: &mut BrainState) {
    let (suspects, edges) = find_suspects_from_events(&state.incident);
    if suspects.is_empty() {
        state.set_suspects(Vec::new());
        state.mesh_summary =
            "No mesh suspects found (no graph driver, no qualifying events).".to_string();
        return;
    }

    state.set_suspects(suspects.iter().cloned());
    for edge in edges {
        state.push_suspect_edge(edge);
    }
    for suspect in &suspects {
        state.push_evidence(format!("mesh-suspect:{suspect}"));
    }
    state.mesh_summary = format!(
        "Suspect services from raw mesh events (no graph driver): {}",
        suspects.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovedIncident;
    use chrono::{TimeZone, Utc};
    use graph_store::{GraphNode, InMemoryGraphStore};

    fn incident() -> ApprovedIncident {
        ApprovedIncident::new(
            "inc-5",
            "checkout-api",
            Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn mesh_graph() -> InMemoryGraphStore {
        let store = InMemoryGraphStore::new();
        store
            .upsert_nodes(vec![
                GraphNode::new("svc:checkout", "").with_property("name", "checkout-api"),
                GraphNode::new("svc:payment", "").with_property("name", "payment-api"),
                GraphNode::new("svc:ledger", "").with_property("name", "ledger-api"),
                GraphNode::new("svc:email", "").with_property("name", "email-api"),
            ])
            .unwrap();
        store
            .upsert_relations(vec![
                GraphRelation::new("svc:checkout", "svc:payment", "DEPENDS_ON"),
                GraphRelation::new("svc:checkout", "svc:email", "DEPENDS_ON"),
                // Second hop through payment.
                GraphRelation::new("svc:payment", "svc:ledger", "DEPENDS_ON"),
                GraphRelation::new("svc:checkout", "svc:payment", "OBSERVED_CALL")
                    .with_property("call_count", 120)
                    .with_property("error_count", 48)
                    .with_property("avg_latency_ms", 840.0)
                    .with_property("p99_latency_ms", 2100.0),
            ])
            .unwrap();
        store
    }

    #[tokio::test]
    async fn graph_strategy_ranks_observed_before_arch_only() {
        let store = mesh_graph();
        let mut state = BrainState::new(incident(), 3, 0.8);
        let ctx = StageContext {
            llm: None,
            mesh_graph: Some(&store),
            code_graph: None,
            critic_decay: 0.02,
        };

        run(&mut state, &ctx).await;

        assert_eq!(state.suspect_services[0], "checkout-api");
        assert_eq!(state.suspect_services[1], "payment-api");
        // Arch-only dependencies follow the observed ones.
        assert!(state.suspect_services.contains(&"email-api".to_string()));
        assert!(state.suspect_services.contains(&"ledger-api".to_string()));
        assert!(state.suspect_edges.contains(&"checkout-api->payment-api".to_string()));
        assert!(state.evidence_refs.contains(&"mesh:observed:payment-api".to_string()));
        assert!(state.evidence_refs.contains(&"mesh:depends_on:email-api".to_string()));
        assert!(state.mesh_summary.contains("payment-api"));
        assert!(state.mesh_summary.contains("40% err rate"));
    }

    #[tokio::test]
    async fn unknown_service_falls_back_to_raw_events() {
        let store = InMemoryGraphStore::new();
        let jsonl = r#"{"ts":"2026-02-22T10:01:00Z","stream":"mesh","service":"checkout-api","upstream":"payment-api","latency_ms":900,"retry_count":6,"response_code":503}"#;
        let mut state = BrainState::new(
            incident().with_context("mesh_events_jsonl", serde_json::json!(jsonl)),
            3,
            0.8,
        );
        let ctx = StageContext {
            llm: None,
            mesh_graph: Some(&store),
            code_graph: None,
            critic_decay: 0.02,
        };

        run(&mut state, &ctx).await;

        assert_eq!(state.suspect_services, vec!["checkout-api", "payment-api"]);
        assert!(state.evidence_refs.contains(&"mesh-suspect:payment-api".to_string()));
        assert!(state.mesh_summary.contains("raw mesh events"));
    }

    #[tokio::test]
    async fn no_signal_keeps_only_incident_service() {
        let mut state = BrainState::new(incident(), 3, 0.8);
        let ctx = StageContext {
            llm: None,
            mesh_graph: None,
            code_graph: None,
            critic_decay: 0.02,
        };

        run(&mut state, &ctx).await;

        assert_eq!(state.suspect_services, vec!["checkout-api"]);
        assert!(state.mesh_summary.contains("No mesh suspects"));
    }
}
