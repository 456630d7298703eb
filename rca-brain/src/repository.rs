//! Persistence facade for investigation reports.

use crate::models::RcaReport;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Thread-safe in-memory report store, keyed by incident id.
///
/// The only process-wide shared resource of the engine; parallel
/// investigations save through the same instance.
#[derive(Default)]
pub struct InMemoryReportRepository {
    reports: RwLock<BTreeMap<String, RcaReport>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, report: RcaReport) {
        if let Ok(mut reports) = self.reports.write() {
            reports.insert(report.incident_id.clone(), report);
        }
    }

    pub fn get(&self, incident_id: &str) -> Option<RcaReport> {
        self.reports.read().ok()?.get(incident_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.reports.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
