//! RCA synthesizer: combines the evidence into ranked hypotheses.

use super::StageContext;
use crate::models::{BrainState, Hypothesis};
use serde_json::Value;

/// Stub confidences, keyed on deployment linkage.
const DEPLOY_LINKED_CONFIDENCE: f64 = 0.86;
const NO_DEPLOY_CONFIDENCE: f64 = 0.62;
/// Fallback hypothesis confidence when LLM JSON cannot be parsed.
const PARSE_FAILURE_CONFIDENCE: f64 = 0.30;

pub async fn run(state: &mut BrainState, ctx: &StageContext<'_>) {
    let Some(llm) = ctx.llm else {
        state.hypotheses = stub_hypotheses(state);
        rank(state);
        return;
    };

    match llm.generate_json(&build_prompt(state)).await {
        Ok(parsed) => match parse_hypotheses(&parsed, &state.evidence_refs) {
            Some(hypotheses) if !hypotheses.is_empty() => {
                state.hypotheses = hypotheses;
            }
            _ => parse_failure(state, "missing or empty 'hypotheses' array"),
        },
        Err(err) => parse_failure(state, &err.to_string()),
    }
    rank(state);
}

fn rank(state: &mut BrainState) {
    state.hypotheses.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn parse_failure(state: &mut BrainState, reason: &str) {
    state.errors.push(format!("synthesizer_parse_error: {reason}"));
    state.hypotheses = vec![Hypothesis::new(
        "Unknown root cause",
        format!("LLM synthesis failed: {reason}"),
        PARSE_FAILURE_CONFIDENCE,
        state.evidence_refs.clone(),
    )];
}

fn parse_hypotheses(parsed: &Value, default_refs: &[String]) -> Option<Vec<Hypothesis>> {
    let items = parsed.get("hypotheses")?.as_array()?;
    let mut hypotheses = Vec::with_capacity(items.len());
    for item in items {
        let title = item.get("title")?.as_str()?;
        let summary = item.get("summary")?.as_str()?;
        let confidence = item.get("confidence")?.as_f64()?;
        let evidence_refs = match item.get("evidence_refs").and_then(Value::as_array) {
            Some(refs) => refs
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => default_refs.to_vec(),
        };
        hypotheses.push(Hypothesis::new(title, summary, confidence, evidence_refs));
    }
    Some(hypotheses)
}

fn stub_hypotheses(state: &BrainState) -> Vec<Hypothesis> {
    let (title, summary, confidence) = if state.incident.deployment_id.is_some() {
        (
            "Recent rollout regression",
            "Error spike aligns with deployment window.",
            DEPLOY_LINKED_CONFIDENCE,
        )
    } else {
        (
            "Traffic or dependency instability",
            "Signal exists but no deployment linkage found.",
            NO_DEPLOY_CONFIDENCE,
        )
    };
    vec![Hypothesis::new(
        title,
        summary,
        confidence,
        state.evidence_refs.clone(),
    )]
}

fn build_prompt(state: &BrainState) -> String {
    let mut raw_logs_block = String::new();
    if !state.incident.extra_context.is_empty() {
        raw_logs_block.push_str("\n\nRaw log evidence:\n");
        for (key, value) in &state.incident.extra_context {
            raw_logs_block.push_str(&format!("  [{key}]\n{value}\n"));
        }
    }

    let mut critique_block = String::new();
    if state.iteration > 1 && !state.critic_reasoning.is_empty() {
        critique_block = format!(
            "\n\nA critic reviewed the previous hypotheses and noted these gaps in the evidence:\n{}\n\
             Keep the same hypotheses if they are still the best fit. Strengthen them by citing \
             more specific evidence from the logs and metrics. Do NOT invent new root causes \
             unless the evidence clearly rules out the existing ones.",
            state.critic_reasoning
        );
    }

    format!(
        "You are an SRE root-cause analyst. Generate root-cause hypotheses for this incident.\n\n\
         Service: {}\n\
         Incident started: {}\n\
         Deployment: {}\n\
         Investigation plan: {}\n\
         Git context: {}\n\
         Metrics context: {}\n\
         Evidence refs: {}{raw_logs_block}{critique_block}\n\n\
         Return ONLY a valid JSON object, no markdown, no extra text:\n\
         {{\n\
           \"hypotheses\": [\n\
             {{\n\
               \"title\": \"Short hypothesis title (max 10 words)\",\n\
               \"summary\": \"2-3 sentence explanation of this root cause and why the evidence supports it.\",\n\
               \"confidence\": 0.85,\n\
               \"evidence_refs\": [\"deploy:xxx\", \"metric:yyy\"]\n\
             }}\n\
           ]\n\
         }}\n\n\
         Provide 2-3 hypotheses ranked from most to least likely.\n\
         Confidence must be between 0.0 and 1.0. If no deployment exists, lower confidence on code-change hypotheses.",
        state.incident.service,
        state.incident.started_at.to_rfc3339(),
        state.incident.deployment_id.as_deref().unwrap_or("none"),
        state.task_plan,
        state.git_summary,
        state.metrics_summary,
        state.evidence_refs.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovedIncident;
    use chrono::{TimeZone, Utc};

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

    fn ctx() -> StageContext<'static> {
        StageContext {
            llm: None,
            mesh_graph: None,
            code_graph: None,
            critic_decay: 0.02,
        }
    }

    #[tokio::test]
    async fn stub_with_deployment_blames_the_rollout() {
        let mut state = state(Some("deploy-1"));
        run(&mut state, &ctx()).await;

        assert_eq!(state.hypotheses.len(), 1);
        assert_eq!(state.hypotheses[0].title, "Recent rollout regression");
        assert_eq!(state.hypotheses[0].confidence, 0.86);
    }

    #[tokio::test]
    async fn stub_without_deployment_blames_instability() {
        let mut state = state(None);
        run(&mut state, &ctx()).await;

        assert_eq!(state.hypotheses[0].title, "Traffic or dependency instability");
        assert_eq!(state.hypotheses[0].confidence, 0.62);
    }

    #[test]
    fn llm_payload_parsing_clamps_confidence() {
        let parsed = serde_json::json!({
            "hypotheses": [
                {"title": "A", "summary": "s", "confidence": 1.8},
                {"title": "B", "summary": "s", "confidence": 0.4, "evidence_refs": ["deploy:x"]}
            ]
        });
        let refs = vec!["incident:inc-1".to_string()];
        let hypotheses = parse_hypotheses(&parsed, &refs).unwrap();

        assert_eq!(hypotheses[0].confidence, 1.0);
        assert_eq!(hypotheses[0].evidence_refs, refs);
        assert_eq!(hypotheses[1].evidence_refs, vec!["deploy:x"]);
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let parsed = serde_json::json!({"hypotheses": [{"title": "A"}]});
        assert!(parse_hypotheses(&parsed, &[]).is_none());
        let missing = serde_json::json!({"other": []});
        assert!(parse_hypotheses(&missing, &[]).is_none());
    }
}
