//! Read-time aggregation of batch readiness.
//!
//! The overall state is a pure function of current membership and the
//! current check results; nothing here is cached or persisted, so the
//! verdict is always consistent with the latest writes without locking.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checks::{CheckResult, CheckState, CheckStore, PublishReportResolver};
use crate::requests::{RequestState, RequestStore, ReviewState, Reviewer};
use crate::staging::batch::{BatchState, StagingBatch};

/// One still-open review across the staged requests, reported with its
/// owning request so humans know where to look.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReview {
    pub request_number: u64,
    pub reviewer: Reviewer,
}

pub struct BatchAggregator<'a> {
    resolver: &'a dyn PublishReportResolver,
    checks: &'a CheckStore,
    requests: &'a RequestStore,
}

impl<'a> BatchAggregator<'a> {
    pub fn new(
        resolver: &'a dyn PublishReportResolver,
        checks: &'a CheckStore,
        requests: &'a RequestStore,
    ) -> Self {
        Self {
            resolver,
            checks,
            requests,
        }
    }

    /// Coarse-grained batch state, first matching rule wins:
    /// empty, unacceptable, testing (missing or pending checks),
    /// failed, acceptable.
    pub async fn overall_state(&self, batch: &StagingBatch) -> BatchState {
        if batch.staged_requests.is_empty() {
            return BatchState::Empty;
        }

        for number in &batch.staged_requests {
            if let Some(request) = self.requests.get(*number).await {
                // A withdrawn request can never ride a batch to acceptance.
                if matches!(
                    request.state,
                    RequestState::Revoked | RequestState::Declined | RequestState::Superseded
                ) {
                    debug!(
                        "Batch {} unacceptable: request {} is {}",
                        batch.name, number, request.state
                    );
                    return BatchState::Unacceptable;
                }
            }
        }

        let mut any_failed = false;
        for target in &batch.targets {
            let Some(report) = self.resolver.current_report(target).await else {
                // Nothing published yet for this target, still building.
                debug!("Batch {}: no publish report for {}", batch.name, target);
                return BatchState::Testing;
            };

            let current = self.checks.results_for(&report.uuid).await;
            for name in &report.required_checks {
                match current.iter().find(|r| &r.name == name) {
                    None => return BatchState::Testing,
                    Some(result) if result.state == CheckState::Pending => {
                        return BatchState::Testing;
                    }
                    Some(_) => {}
                }
            }
            if current.iter().any(|r| r.state == CheckState::Failure) {
                any_failed = true;
            }
        }

        if any_failed {
            BatchState::Failed
        } else {
            BatchState::Acceptable
        }
    }

    /// Required check names with no *current* result, across all targets.
    /// Stale results (recorded against a superseded report uuid) count as
    /// missing here, never as failed.
    pub async fn missing_checks(&self, batch: &StagingBatch) -> Vec<String> {
        let mut missing = Vec::new();
        for target in &batch.targets {
            let Some(report) = self.resolver.current_report(target).await else {
                continue;
            };
            let current = self.checks.results_for(&report.uuid).await;
            for name in &report.required_checks {
                if !current.iter().any(|r| &r.name == name) && !missing.contains(name) {
                    missing.push(name.clone());
                }
            }
        }
        missing
    }

    /// Current check results across all targets; stale results are excluded.
    pub async fn checks(&self, batch: &StagingBatch) -> Vec<CheckResult> {
        let mut all = Vec::new();
        for target in &batch.targets {
            if let Some(report) = self.resolver.current_report(target).await {
                all.extend(self.checks.results_for(&report.uuid).await);
            }
        }
        all
    }

    /// Union of still-`new` review assignments across the staged requests.
    /// Drives human attention; does not gate the overall state.
    pub async fn missing_reviews(&self, batch: &StagingBatch) -> Vec<PendingReview> {
        let mut pending = Vec::new();
        for number in &batch.staged_requests {
            if let Some(request) = self.requests.get(*number).await {
                for review in &request.reviews {
                    if review.state == ReviewState::New {
                        pending.push(PendingReview {
                            request_number: *number,
                            reviewer: review.reviewer.clone(),
                        });
                    }
                }
            }
        }
        pending
    }
}
