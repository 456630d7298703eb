//! Raw mesh-event evidence: JSONL parsing and degradation detection.
//!
//! When no mesh graph store is wired, the scout falls back to the raw
//! event stream carried in the incident's `extra_context` under
//! `mesh_events` (JSON array) or `mesh_events_jsonl` (JSON Lines blob).
//! Parsing is tolerant: malformed lines are skipped, never fatal.

use crate::models::ApprovedIncident;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One observed call between two services in the mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshEvent {
    pub ts: DateTime<Utc>,
    #[serde(default)]
    pub stream: String,
    pub service: String,
    pub upstream: String,
    #[serde(default)]
    pub latency_ms: f64,
    #[serde(default)]
    pub retry_count: f64,
    #[serde(default)]
    pub response_code: u16,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Pulls mesh events out of the incident's evidence bag.
pub fn extract_mesh_events(extra_context: &std::collections::BTreeMap<String, Value>) -> Vec<MeshEvent> {
    let raw = extra_context
        .get("mesh_events")
        .or_else(|| extra_context.get("mesh_events_jsonl"));

    match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Some(Value::String(blob)) => blob
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn median(values: &mut Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

#[derive(Default)]
struct UpstreamStats {
    count: f64,
    err: f64,
    lat_sum: f64,
    retry_sum: f64,
}

/// Degradation thresholds for the raw-event fallback.
const ERR_RATE_DEGRADED: f64 = 0.10;
const RETRY_DEGRADED: f64 = 3.0;
const BASELINE_LATENCY_FACTOR: f64 = 2.0;
const ABSOLUTE_LATENCY_DEGRADED_MS: f64 = 500.0;

/// Finds degraded upstream dependencies of the incident service.
///
/// Baseline latency is the median of calls in the 30 minutes before the
/// incident start. An upstream is suspect when, in the incident window,
/// any of the following holds: server-error rate ≥ 10%, average retries
/// ≥ 3, average latency at least twice a non-zero baseline, or average
/// latency ≥ 500 ms.
///
/// Returns `(suspect_services, suspect_edges)` in first-seen order,
/// deduplicated.
pub fn find_suspects_from_events(incident: &ApprovedIncident) -> (Vec<String>, Vec<String>) {
    let events = extract_mesh_events(&incident.extra_context);
    if events.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let start = incident.started_at;
    let pre_start = start - Duration::minutes(30);

    let mut baseline_latency: Vec<f64> = Vec::new();
    // Keep first-seen upstream order.
    let mut current: Vec<(String, UpstreamStats)> = Vec::new();

    for event in &events {
        if event.service != incident.service {
            continue;
        }
        let upstream = event.upstream.trim();
        if upstream.is_empty() {
            continue;
        }

        if pre_start <= event.ts && event.ts < start {
            baseline_latency.push(event.latency_ms);
        }
        if event.ts < start {
            continue;
        }

        let idx = match current.iter().position(|(name, _)| name == upstream) {
            Some(idx) => idx,
            None => {
                current.push((upstream.to_string(), UpstreamStats::default()));
                current.len() - 1
            }
        };
        let stats = &mut current[idx].1;
        stats.count += 1.0;
        stats.lat_sum += event.latency_ms;
        stats.retry_sum += event.retry_count;
        if event.response_code >= 500 {
            stats.err += 1.0;
        }
    }

    if current.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let baseline = median(&mut baseline_latency);
    let mut suspects = Vec::new();
    let mut suspect_edges = Vec::new();

    for (upstream, stats) in &current {
        let count = stats.count.max(1.0);
        let err_rate = stats.err / count;
        let avg_latency = stats.lat_sum / count;
        let avg_retry = stats.retry_sum / count;

        let degraded = err_rate >= ERR_RATE_DEGRADED
            || avg_retry >= RETRY_DEGRADED
            || (baseline > 0.0 && avg_latency >= baseline * BASELINE_LATENCY_FACTOR)
            || avg_latency >= ABSOLUTE_LATENCY_DEGRADED_MS;

        if degraded && !suspects.contains(upstream) {
            suspects.push(upstream.clone());
            suspect_edges.push(format!("{}->{}", incident.service, upstream));
        }
    }

    (suspects, suspect_edges)
}
