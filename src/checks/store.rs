//! Durable store for named check signals, keyed by `(report uuid, name)`.
//!
//! Concurrent writers for the same key race under last-write-wins. Results
//! are bucketed by report uuid, so a result computed against a superseded
//! build can never shadow a newer build's checks.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::checks::report::{CheckResult, CheckState};

pub struct CheckStore {
    results: RwLock<HashMap<String, HashMap<String, CheckResult>>>,
}

impl CheckStore {
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace the result for `(report_uuid, name)`.
    pub async fn upsert(
        &self,
        report_uuid: &str,
        name: &str,
        state: CheckState,
        details: Option<String>,
    ) -> CheckResult {
        let result = CheckResult {
            report_uuid: report_uuid.to_string(),
            name: name.to_string(),
            state,
            details,
            updated_at: Utc::now(),
        };

        let mut results = self.results.write().await;
        results
            .entry(report_uuid.to_string())
            .or_default()
            .insert(name.to_string(), result.clone());
        debug!("Recorded check {} for report {}: {:?}", name, report_uuid, state);
        result
    }

    /// All results recorded against one report uuid, ordered by name.
    pub async fn results_for(&self, report_uuid: &str) -> Vec<CheckResult> {
        let results = self.results.read().await;
        let mut list: Vec<CheckResult> = results
            .get(report_uuid)
            .map(|by_name| by_name.values().cloned().collect())
            .unwrap_or_default();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub async fn get(&self, report_uuid: &str, name: &str) -> Option<CheckResult> {
        let results = self.results.read().await;
        results
            .get(report_uuid)
            .and_then(|by_name| by_name.get(name))
            .cloned()
    }
}

impl Default for CheckStore {
    fn default() -> Self {
        Self::new()
    }
}
