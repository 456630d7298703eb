//! Metric analyst: characterises the expected metric anomaly shape and
//! merges raw-event suspects when the mesh scout came up empty.

use super::{StageContext, query_scopes};
use crate::mesh::find_suspects_from_events;
use crate::models::BrainState;

pub async fn run(state: &mut BrainState, ctx: &StageContext<'_>) {
    state.push_evidence(format!("metric:{}:p99", state.incident.service));

    // The mesh scout populates more than one entry when it finds real
    // dependencies; only then is the raw-event sweep redundant.
    if state.suspect_services.len() <= 1 {
        let (suspects, edges) = find_suspects_from_events(&state.incident);
        if !suspects.is_empty() {
            let merged: Vec<String> = state
                .suspect_services
                .iter()
                .cloned()
                .chain(suspects.iter().cloned())
                .collect();
            state.set_suspects(merged);
            for edge in edges {
                state.push_suspect_edge(edge);
            }
            for suspect in &suspects {
                state.push_evidence(format!("mesh-suspect:{suspect}"));
                state.push_evidence(format!("logs:{suspect}"));
            }
        }
    } else {
        // Suspects already known; attach the log evidence trail for them.
        let known: Vec<String> = state.suspect_services[1..].to_vec();
        for suspect in known {
            state.push_evidence(format!("logs:{suspect}"));
        }
    }

    if let Some(llm) = ctx.llm {
        match llm.generate(&build_prompt(state)).await {
            Ok(text) if !text.trim().is_empty() => {
                state.metrics_summary = text;
                return;
            }
            Ok(_) => state
                .errors
                .push("metric_analyst_llm_error: empty completion".to_string()),
            Err(err) => state.errors.push(format!("metric_analyst_llm_error: {err}")),
        }
    }

    state.metrics_summary = stub_summary(state);
}

fn build_prompt(state: &BrainState) -> String {
    let mut raw_logs_block = String::new();
    if !state.incident.extra_context.is_empty() {
        raw_logs_block.push_str("\n\nRaw log evidence from the incident bundle:\n");
        for (key, value) in &state.incident.extra_context {
            raw_logs_block.push_str(&format!("  [{key}]\n{value}\n"));
        }
    }

    format!(
        "You are an SRE metrics expert analysing a production incident.\n\n\
         Service: {}\n\
         Suspect services in scope: {}\n\
         Incident started: {}\n\
         Deployment: {}\n\
         Investigation plan: {}\n\
         Git context: {}{raw_logs_block}\n\n\
         In 3-5 sentences, describe the likely metric anomaly pattern:\n\
         - Which RED metrics (request rate, error rate, latency/p99) and resource signals (CPU, memory, DB connections) would confirm this incident.\n\
         - Characterise the anomaly shape: step spike, slow creep, periodic oscillation, or sustained saturation.\n\
         - Note any downstream service signals that should be checked.",
        state.incident.service,
        query_scopes(state).join(", "),
        state.incident.started_at.to_rfc3339(),
        state.incident.deployment_id.as_deref().unwrap_or("none"),
        state.task_plan,
        state.git_summary,
    )
}

fn stub_summary(state: &BrainState) -> String {
    let scope_line = if state.suspect_services.is_empty() {
        String::new()
    } else {
        format!(" Suspect dependencies: {}.", state.suspect_services.join(", "))
    };
    format!(
        "Anomaly detected on {}. Expect elevated p99 latency and error rate in the \
         incident window. Check CPU and connection pool saturation.{scope_line}",
        state.incident.service
    )
}
