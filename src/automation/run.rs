//! Automation run ledger.
//!
//! One row per webhook delivery: the normalized envelope, the ordered step
//! outcomes, the final status and the response body mirrored back to the
//! SCM. Append-only; the ledger is the audit trail for reconciling partial
//! automation after step failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::PackflowError;
use crate::scm::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Success,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
    /// Step not applicable to this event; recorded for the audit trail.
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: String,
    pub status: StepStatus,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl StepOutcome {
    pub fn new(step: &str, status: StepStatus, message: String) -> Self {
        Self {
            step: step.to_string(),
            status,
            message,
            recorded_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> String {
        let status = match self.status {
            StepStatus::Success => "ok",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        format!("{}: {} ({})", self.step, status, self.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRun {
    pub id: u64,
    pub envelope: Envelope,
    pub status: RunStatus,
    pub steps: Vec<StepOutcome>,
    pub response_body: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

pub struct RunLedger {
    runs: RwLock<HashMap<u64, AutomationRun>>,
    next_id: AtomicU64,
}

impl RunLedger {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn create(&self, envelope: Envelope) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let run = AutomationRun {
            id,
            envelope,
            status: RunStatus::Pending,
            steps: Vec::new(),
            response_body: String::new(),
            created_at: Utc::now(),
            finished_at: None,
        };
        let mut runs = self.runs.write().await;
        runs.insert(id, run);
        id
    }

    pub async fn append_outcome(&self, id: u64, outcome: StepOutcome) -> Result<(), PackflowError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .get_mut(&id)
            .ok_or_else(|| PackflowError::NotFound(format!("Automation run {}", id)))?;
        run.steps.push(outcome);
        Ok(())
    }

    pub async fn finalize(
        &self,
        id: u64,
        status: RunStatus,
        response_body: String,
    ) -> Result<(), PackflowError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .get_mut(&id)
            .ok_or_else(|| PackflowError::NotFound(format!("Automation run {}", id)))?;
        run.status = status;
        run.response_body = response_body;
        run.finished_at = Some(Utc::now());
        Ok(())
    }

    pub async fn get(&self, id: u64) -> Option<AutomationRun> {
        let runs = self.runs.read().await;
        runs.get(&id).cloned()
    }

    pub async fn list(&self) -> Vec<AutomationRun> {
        let runs = self.runs.read().await;
        let mut list: Vec<AutomationRun> = runs.values().cloned().collect();
        list.sort_by_key(|r| r.id);
        list
    }
}

impl Default for RunLedger {
    fn default() -> Self {
        Self::new()
    }
}
