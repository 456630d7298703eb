//! Supervisor: frames the investigation and writes the task plan.

use super::StageContext;
use crate::models::BrainState;
use tracing::debug;

/// Increments the iteration counter, anchors the evidence trail and
/// produces a short investigation plan.
///
/// On refinement loops (iteration > 1 with critic feedback present) the
/// plan instructs the downstream stages to strengthen evidence for the
/// existing leading hypothesis rather than pivot.
pub async fn run(state: &mut BrainState, ctx: &StageContext<'_>) {
    state.iteration += 1;
    debug!(
        "supervisor: iteration {} for incident {}",
        state.iteration, state.incident.incident_id
    );

    // The incident service always leads the suspect scope.
    let carried: Vec<String> = state.suspect_services.clone();
    state.set_suspects(carried);

    state.push_evidence(format!("incident:{}", state.incident.incident_id));
    if let Some(deployment_id) = state.incident.deployment_id.clone() {
        state.push_evidence(format!("deploy:{deployment_id}"));
    }

    if let Some(llm) = ctx.llm {
        match llm.generate(&build_prompt(state)).await {
            Ok(text) if !text.trim().is_empty() => {
                state.task_plan = text;
                return;
            }
            Ok(_) => state.errors.push("supervisor_llm_error: empty completion".to_string()),
            Err(err) => state.errors.push(format!("supervisor_llm_error: {err}")),
        }
    }

    state.task_plan = stub_plan(state);
}

fn build_prompt(state: &BrainState) -> String {
    let mut evidence_block = String::new();
    if !state.incident.extra_context.is_empty() {
        evidence_block.push_str("\n\nAdditional evidence from the incident bundle:\n");
        for (key, value) in &state.incident.extra_context {
            evidence_block.push_str(&format!("  [{key}]\n{value}\n"));
        }
    }

    let mut refinement_block = String::new();
    if state.iteration > 1 && !state.critic_reasoning.is_empty() {
        refinement_block = format!(
            "\n\nA critic flagged these gaps in the previous investigation:\n{}\n\
             Focus on gathering stronger evidence for the existing theory rather than \
             pivoting to a new one, unless the critic has explicitly ruled it out.",
            state.critic_reasoning
        );
    }

    format!(
        "You are a senior SRE analyst. An incident has been reported.\n\n\
         Incident details:\n\
         - Service: {}\n\
         - Started at: {}\n\
         - Linked deployment: {}{evidence_block}{refinement_block}\n\n\
         In 2-3 sentences, write a focused investigation plan: what evidence to gather \
         and which failure modes to explore first.\n\
         Do not speculate beyond the facts given. Be concise and actionable.",
        state.incident.service,
        state.incident.started_at.to_rfc3339(),
        state.incident.deployment_id.as_deref().unwrap_or("none"),
    )
}

fn stub_plan(state: &BrainState) -> String {
    let deployment_line = match &state.incident.deployment_id {
        Some(id) => format!("Linked deployment {id} is a prime suspect."),
        None => "No linked deployment; check infrastructure and dependency signals.".to_string(),
    };
    format!(
        "Investigate {} incident starting at {}. {}",
        state.incident.service,
        state.incident.started_at.to_rfc3339(),
        deployment_line
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovedIncident;
    use chrono::{TimeZone, Utc};

    fn state_with_deploy() -> BrainState {
        let incident = ApprovedIncident::new(
            "inc-1",
            "checkout-api",
            Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap(),
        )
        .unwrap()
        .with_deployment("deploy-1");
        BrainState::new(incident, 3, 0.8)
    }

    fn ctx() -> StageContext<'static> {
        StageContext {
            llm: None,
            mesh_graph: None,
            code_graph: None,
            critic_decay: 0.02,
        }
    }

    #[tokio::test]
    async fn increments_iteration_and_anchors_evidence() {
        let mut state = state_with_deploy();
        run(&mut state, &ctx()).await;

        assert_eq!(state.iteration, 1);
        assert_eq!(state.evidence_refs, vec!["incident:inc-1", "deploy:deploy-1"]);
        assert_eq!(state.suspect_services, vec!["checkout-api"]);
        assert!(state.task_plan.contains("deploy-1"));

        run(&mut state, &ctx()).await;
        assert_eq!(state.iteration, 2);
        // Evidence stays deduplicated across iterations.
        assert_eq!(state.evidence_refs.len(), 2);
    }

    #[tokio::test]
    async fn refinement_prompt_carries_critic_feedback() {
        let mut state = state_with_deploy();
        state.iteration = 1;
        state.critic_reasoning = "deployment linkage is circumstantial".to_string();
        state.iteration += 1; // simulate a second entry for prompt building
        let prompt = build_prompt(&state);
        assert!(prompt.contains("critic flagged"));
        assert!(prompt.contains("circumstantial"));
    }
}
