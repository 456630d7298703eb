//! Fix advisor: recommends one intervention valid across all plausible
//! causes.
//!
//! The critic may flag evidential ambiguity, but the on-call engineer
//! still needs an action. `fix_confidence` is independent of cause
//! certainty and feeds the final completed/escalated decision.

use super::StageContext;
use crate::models::BrainState;

/// Stub weighting of mean hypothesis confidence.
const STUB_CONFIDENCE_FACTOR: f64 = 0.9;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub async fn run(state: &mut BrainState, ctx: &StageContext<'_>) {
    if state.hypotheses.is_empty() {
        state.fix_summary = "No hypotheses available; manual investigation required.".to_string();
        state.fix_confidence = 0.0;
        state.fix_reasoning = "No hypotheses to base a fix on.".to_string();
        return;
    }

    let top = state
        .top_hypothesis()
        .cloned()
        .expect("non-empty hypothesis list");

    if let Some(llm) = ctx.llm {
        match llm.generate_json(&build_prompt(state, &top.title, &top.summary)).await {
            Ok(parsed) => {
                state.fix_summary = parsed
                    .get("fix")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("No fix suggested.")
                    .to_string();
                let confidence = parsed
                    .get("fix_confidence")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.5);
                state.set_fix_confidence(confidence);
                state.fix_reasoning = parsed
                    .get("fix_reasoning")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("No reasoning provided.")
                    .to_string();
                return;
            }
            Err(err) => {
                state.errors.push(format!("fix_advisor_parse_error: {err}"));
                state.fix_summary = format!("Fix advisor failed ({err}). Manual review recommended.");
                state.fix_confidence = 0.0;
                state.fix_reasoning = format!("LLM fix advisor error: {err}");
                return;
            }
        }
    }

    // Deterministic stub: derive fix confidence from hypothesis agreement.
    let mean_confidence: f64 = state
        .hypotheses
        .iter()
        .map(|h| h.confidence)
        .sum::<f64>()
        / state.hypotheses.len() as f64;
    state.set_fix_confidence(round2((mean_confidence * STUB_CONFIDENCE_FACTOR).min(1.0)));
    state.fix_summary = format!(
        "Investigate and remediate: {} on {}.",
        top.title.to_lowercase(),
        state.incident.service
    );
    state.fix_reasoning = format!(
        "Stub fix advisor: derived from top hypothesis '{}' (confidence {:.2}) averaged across {} hypothesis/es.",
        top.title,
        top.confidence,
        state.hypotheses.len()
    );
}

fn build_prompt(state: &BrainState, top_title: &str, top_summary: &str) -> String {
    let hypothesis_list = state
        .hypotheses
        .iter()
        .enumerate()
        .map(|(i, h)| format!("  {}. {} (confidence={:.2})", i + 1, h.title, h.confidence))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an SRE fix advisor. The investigation team has produced hypotheses but the exact \
         root cause is uncertain. Your job is NOT to determine the exact cause; the critic already \
         flagged ambiguity. Your job is to recommend the single best remediation that is safe and \
         effective across ALL plausible causes.\n\n\
         Incident: {} at {}\n\
         Top hypothesis: \"{top_title}\"\n\
         Summary: {top_summary}\n\
         Critic's concern: {}\n\n\
         All hypotheses under consideration:\n{hypothesis_list}\n\n\
         Ask yourself:\n\
         - Is there a single fix that resolves the incident regardless of which hypothesis is correct?\n\
         - What is the minimum-risk intervention an on-call engineer can safely apply right now?\n\
         - Who owns the affected component: can we fix it ourselves or do we need to escalate to a third party?\n\
         - Does the fix hold even if the critic's alternative explanation turns out to be true?\n\n\
         Return ONLY a valid JSON object, no markdown, no extra text:\n\
         {{\"fix\": \"Concise action: what to do and on which service/config\", \"fix_confidence\": 0.90, \"fix_reasoning\": \"This fix is valid because it addresses the symptom regardless of cause X or Y...\"}}\n\n\
         fix_confidence guide: 0.9+ = fix is safe under all plausible causes, 0.7-0.89 = covers most \
         cases with low risk, <0.7 = uncertain or depends on which hypothesis is correct.",
        state.incident.service,
        state.incident.started_at.to_rfc3339(),
        state.critic_reasoning,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApprovedIncident, Hypothesis};
    use chrono::{TimeZone, Utc};

    fn base_state() -> BrainState {
        let incident = ApprovedIncident::new(
            "inc-1",
            "checkout-api",
            Utc.with_ymd_and_hms(2026, 2, 22, 10, 0, 0).unwrap(),
        )
        .unwrap();
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
    async fn stub_confidence_is_scaled_mean_rounded_to_cents() {
        let mut state = base_state();
        state.hypotheses = vec![Hypothesis::new("Recent rollout regression", "s", 0.86, vec![])];
        run(&mut state, &ctx()).await;

        // 0.86 * 0.9 = 0.774, rounded to 0.77.
        assert!((state.fix_confidence - 0.77).abs() < 1e-9);
        assert!(state.fix_summary.contains("recent rollout regression"));
        assert!(state.fix_summary.contains("checkout-api"));
        assert!(!state.fix_reasoning.is_empty());
    }

    #[tokio::test]
    async fn mean_is_taken_across_all_hypotheses() {
        let mut state = base_state();
        state.hypotheses = vec![
            Hypothesis::new("A", "s", 0.8, vec![]),
            Hypothesis::new("B", "s", 0.4, vec![]),
        ];
        run(&mut state, &ctx()).await;

        // mean 0.6 * 0.9 = 0.54.
        assert!((state.fix_confidence - 0.54).abs() < 1e-9);
    }

    #[tokio::test]
    async fn no_hypotheses_yields_zero_confidence_with_explanation() {
        let mut state = base_state();
        run(&mut state, &ctx()).await;

        assert_eq!(state.fix_confidence, 0.0);
        assert!(state.fix_summary.contains("manual investigation"));
        assert!(!state.fix_reasoning.is_empty());
    }
}
