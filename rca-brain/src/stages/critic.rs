//! Critic: challenges the leading hypothesis and scores it.
//!
//! The stub score decays with each refinement loop
//! (`top.confidence - decay * (iteration - 1)`), so an investigation the
//! critic never strengthens eventually escalates instead of looping.

use super::StageContext;
use crate::models::BrainState;

pub async fn run(state: &mut BrainState, ctx: &StageContext<'_>) {
    let Some(top) = state.top_hypothesis().cloned() else {
        state.critic_score = 0.0;
        return;
    };

    if let Some(llm) = ctx.llm {
        match llm.generate_json(&build_prompt(state, &top.title, &top.summary, &top.evidence_refs)).await {
            Ok(parsed) => {
                let score = parsed.get("score").and_then(|v| v.as_f64()).unwrap_or(0.5);
                state.set_critic_score(score);
                state.critic_reasoning = parsed
                    .get("reasoning")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or("LLM returned no reasoning.")
                    .to_string();
                return;
            }
            Err(err) => {
                state.errors.push(format!("critic_parse_error: {err}"));
                apply_stub(state, top.confidence, ctx.critic_decay);
                state.critic_reasoning = format!("LLM critic failed ({err}); stub score applied.");
                return;
            }
        }
    }

    apply_stub(state, top.confidence, ctx.critic_decay);
    let decay = stub_decay(state.iteration, ctx.critic_decay);
    state.critic_reasoning = format!(
        "Stub evaluation: top hypothesis confidence {:.2} with decay {decay:.2}.",
        top.confidence
    );
}

fn stub_decay(iteration: u32, decay_per_iteration: f64) -> f64 {
    (decay_per_iteration * (iteration.saturating_sub(1) as f64)).max(0.0)
}

fn apply_stub(state: &mut BrainState, top_confidence: f64, decay_per_iteration: f64) {
    let decay = stub_decay(state.iteration, decay_per_iteration);
    state.set_critic_score((top_confidence - decay).max(0.0));
}

fn build_prompt(state: &BrainState, title: &str, summary: &str, evidence: &[String]) -> String {
    format!(
        "You are a critical SRE reviewer. Your job is to DISPROVE the proposed root cause.\n\n\
         Incident: {} at {}\n\
         Top hypothesis: \"{title}\"\n\
         Explanation: {summary}\n\
         Evidence: {}\n\
         Deployment: {}\n\
         Metrics context: {}\n\
         Investigation iteration: {}\n\n\
         Ask yourself:\n\
         - Is there a simpler explanation that fits the data better?\n\
         - Did the regression start BEFORE the deployment went out?\n\
         - Is the evidence actually strong or circumstantial?\n\
         - Are there alternative causes (traffic spike, dependency failure, infra issue)?\n\n\
         Return ONLY a valid JSON object, no markdown, no extra text:\n\
         {{\"score\": 0.85, \"reasoning\": \"Concise critique: what confirms or undermines the hypothesis.\"}}\n\n\
         Score guide: 0.9+ = definitive, 0.8 = strong, 0.6-0.79 = plausible, <0.6 = weak evidence.",
        state.incident.service,
        state.incident.started_at.to_rfc3339(),
        evidence.join(", "),
        state.incident.deployment_id.as_deref().unwrap_or("none"),
        state.metrics_summary,
        state.iteration,
    )
}
