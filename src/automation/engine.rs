//! Automation run driver.
//!
//! One call per webhook delivery: create the ledger row, post the initial
//! pending status, apply the configured steps in order, record every
//! outcome, post per-target statuses after branch/link success, finalize.
//! Steps are not transactional as a group; a failed step is recorded and
//! the remaining steps still run.

use std::sync::Arc;

use tracing::{info, warn};

use crate::automation::run::{AutomationRun, RunLedger, RunStatus, StepOutcome, StepStatus};
use crate::automation::steps::StepContext;
use crate::automation::subscriptions::SubscriptionManager;
use crate::backend::BuildBackendClient;
use crate::config::workflows::StepConfig;
use crate::error::PackflowError;
use crate::requests::RequestStore;
use crate::scm::{CommitState, Envelope, ReporterError, StatusReporter};

/// Context string of the coarse whole-run status check.
pub const RUN_STATUS_CONTEXT: &str = "packflow/workflow";

pub struct AutomationEngine {
    actor: String,
    steps: Vec<StepConfig>,
    backend: Arc<dyn BuildBackendClient>,
    subscriptions: Arc<dyn SubscriptionManager>,
    reporter: Arc<dyn StatusReporter>,
    requests: Arc<RequestStore>,
    ledger: Arc<RunLedger>,
}

impl AutomationEngine {
    pub fn new(
        actor: &str,
        steps: Vec<StepConfig>,
        backend: Arc<dyn BuildBackendClient>,
        subscriptions: Arc<dyn SubscriptionManager>,
        reporter: Arc<dyn StatusReporter>,
        requests: Arc<RequestStore>,
        ledger: Arc<RunLedger>,
    ) -> Self {
        Self {
            actor: actor.to_string(),
            steps,
            backend,
            subscriptions,
            reporter,
            requests,
            ledger,
        }
    }

    /// Process one delivery. Returns the finalized run; an `Err` is only
    /// produced for envelopes rejected before any step ran.
    pub async fn process(&self, envelope: Envelope) -> Result<AutomationRun, PackflowError> {
        let run_id = self.ledger.create(envelope.clone()).await;

        if let Err(err) = envelope.validate() {
            self.ledger
                .finalize(run_id, RunStatus::Fail, err.to_string())
                .await?;
            return Err(err);
        }

        info!(
            "Run {}: {} {} event for {}",
            run_id,
            envelope.scm,
            match envelope.event {
                crate::scm::EventKind::Push => "push",
                crate::scm::EventKind::TagPush => "tag_push",
                crate::scm::EventKind::PullRequest => "pull_request",
            },
            envelope.target_repository_full_name
        );

        let mut notes: Vec<String> = Vec::new();

        if let Err(fatal) = self
            .post_status(&envelope, CommitState::Pending, RUN_STATUS_CONTEXT, &mut notes)
            .await
        {
            return self.finish(run_id, RunStatus::Fail, notes, fatal).await;
        }

        let ctx = StepContext {
            actor: &self.actor,
            backend: self.backend.as_ref(),
            subscriptions: self.subscriptions.as_ref(),
            requests: self.requests.as_ref(),
        };

        let mut any_failed = false;
        for step in &self.steps {
            if !step.applies_to(&envelope) {
                self.ledger
                    .append_outcome(
                        run_id,
                        StepOutcome::new(
                            step.kind(),
                            StepStatus::Skipped,
                            "not applicable to this event".to_string(),
                        ),
                    )
                    .await?;
                continue;
            }

            match step.apply(&envelope, &ctx).await {
                Ok(report) => {
                    self.ledger
                        .append_outcome(
                            run_id,
                            StepOutcome::new(
                                step.kind(),
                                StepStatus::Success,
                                report.message.clone(),
                            ),
                        )
                        .await?;

                    // Branch/link targets get a pending status per
                    // repository/architecture configured for them.
                    if let Some(target) = &report.target {
                        if matches!(
                            step,
                            StepConfig::BranchPackage(_) | StepConfig::LinkPackage(_)
                        ) {
                            if let Err(fatal) = self
                                .post_target_statuses(&envelope, &target.project, &mut notes)
                                .await
                            {
                                return self
                                    .finish(run_id, RunStatus::Fail, notes, fatal)
                                    .await;
                            }
                        }
                    }
                }
                Err(err) => {
                    any_failed = true;
                    warn!("Run {}: step {} failed: {}", run_id, step.kind(), err);
                    self.ledger
                        .append_outcome(
                            run_id,
                            StepOutcome::new(step.kind(), StepStatus::Failed, err.to_string()),
                        )
                        .await?;
                }
            }
        }

        let status = if any_failed {
            RunStatus::Fail
        } else {
            RunStatus::Success
        };
        let final_state = match status {
            RunStatus::Success => CommitState::Success,
            _ => CommitState::Failure,
        };
        if let Err(fatal) = self
            .post_status(&envelope, final_state, RUN_STATUS_CONTEXT, &mut notes)
            .await
        {
            return self.finish(run_id, RunStatus::Fail, notes, fatal).await;
        }

        let run = self.compose_and_finalize(run_id, status, notes).await?;
        Ok(run)
    }

    /// Post one status; transport problems become notes, an unauthorized
    /// response is fatal for the run.
    async fn post_status(
        &self,
        envelope: &Envelope,
        state: CommitState,
        context: &str,
        notes: &mut Vec<String>,
    ) -> Result<(), String> {
        match self.reporter.report(envelope, state, context, None).await {
            Ok(()) => Ok(()),
            Err(ReporterError::Unauthorized(msg)) => Err(format!(
                "SCM rejected the stored credential ({}); rotate the token and redeliver",
                msg
            )),
            Err(ReporterError::Transport(msg)) => {
                warn!("Status post failed ({}): {}", context, msg);
                notes.push(format!("status post failed ({}): {}", context, msg));
                Ok(())
            }
        }
    }

    async fn post_target_statuses(
        &self,
        envelope: &Envelope,
        project: &str,
        notes: &mut Vec<String>,
    ) -> Result<(), String> {
        let repositories = match self.backend.repositories(project).await {
            Ok(repositories) => repositories,
            Err(err) => {
                notes.push(format!("could not list repositories of {}: {}", project, err));
                return Ok(());
            }
        };

        for repository in &repositories {
            for architecture in &repository.architectures {
                let context = format!("packflow/{}/{}", repository.name, architecture);
                self.post_status(envelope, CommitState::Pending, &context, notes)
                    .await?;
            }
        }
        Ok(())
    }

    async fn finish(
        &self,
        run_id: u64,
        status: RunStatus,
        mut notes: Vec<String>,
        fatal: String,
    ) -> Result<AutomationRun, PackflowError> {
        notes.push(fatal);
        self.compose_and_finalize(run_id, status, notes).await
    }

    async fn compose_and_finalize(
        &self,
        run_id: u64,
        status: RunStatus,
        notes: Vec<String>,
    ) -> Result<AutomationRun, PackflowError> {
        let run = self
            .ledger
            .get(run_id)
            .await
            .ok_or_else(|| PackflowError::NotFound(format!("Automation run {}", run_id)))?;

        let mut lines: Vec<String> = run.steps.iter().map(StepOutcome::summary).collect();
        lines.extend(notes);
        let body = lines.join("\n");

        self.ledger.finalize(run_id, status, body).await?;
        self.ledger
            .get(run_id)
            .await
            .ok_or_else(|| PackflowError::NotFound(format!("Automation run {}", run_id)))
    }
}
