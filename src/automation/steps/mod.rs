//! Automation step dispatch.
//!
//! Steps form a closed set; each kind reacts to the normalized envelope
//! with an idempotent create-or-reuse mutation against the build backend.
//! A step failure terminates that step only: effects of earlier steps in
//! the same run stay committed.

mod branch;
mod configure;
mod link;
mod rebuild;
mod set_flags;
mod submit;

use thiserror::Error;

use crate::backend::{BackendError, BuildBackendClient, PackageRef};
use crate::automation::subscriptions::SubscriptionManager;
use crate::config::workflows::StepConfig;
use crate::error::PackflowError;
use crate::requests::RequestStore;
use crate::scm::{Envelope, EventKind, PrAction};

/// Collaborators a step works against, composed explicitly.
pub struct StepContext<'a> {
    /// Acting identity for build backend mutations.
    pub actor: &'a str,
    pub backend: &'a dyn BuildBackendClient,
    pub subscriptions: &'a dyn SubscriptionManager,
    pub requests: &'a RequestStore,
}

#[derive(Error, Debug)]
pub enum StepError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("source not found: {0}")]
    NotFound(String),

    #[error("no permission: {0}")]
    NoPermission(String),

    #[error("transport: {0}")]
    Transport(String),
}

impl From<BackendError> for StepError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(msg) => Self::NotFound(msg),
            BackendError::NoPermission(msg) => Self::NoPermission(msg),
            BackendError::Conflict(msg) => Self::Validation(msg),
            BackendError::Transport(msg) => Self::Transport(msg),
        }
    }
}

impl From<PackflowError> for StepError {
    fn from(err: PackflowError) -> Self {
        match err {
            PackflowError::ValidationError(msg) | PackflowError::StateViolation(msg) => {
                Self::Validation(msg)
            }
            PackflowError::NotFound(msg) => Self::NotFound(msg),
            PackflowError::NoPermission(msg) => Self::NoPermission(msg),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Successful step result: a human-readable message for the run ledger and
/// the target the step created or touched, when there is one. The engine
/// uses the target to post per repository/architecture statuses.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub message: String,
    pub target: Option<PackageRef>,
}

impl StepReport {
    pub fn message(message: String) -> Self {
        Self {
            message,
            target: None,
        }
    }

    pub fn with_target(message: String, target: PackageRef) -> Self {
        Self {
            message,
            target: Some(target),
        }
    }
}

impl StepConfig {
    /// Whether this step reacts to the given event at all. Inapplicable
    /// combinations are recorded as skipped, not failed.
    pub fn applies_to(&self, envelope: &Envelope) -> bool {
        match envelope.event {
            EventKind::Push | EventKind::TagPush => true,
            EventKind::PullRequest => match (self, envelope.action) {
                // Submitting a request makes sense once content is pushed
                // or tagged, never for PR scratch builds.
                (StepConfig::SubmitRequest(_), _) => false,
                (StepConfig::ConfigureRepositories(_), Some(PrAction::Reopened)) => false,
                (StepConfig::RebuildPackage(_), Some(PrAction::Closed)) => false,
                (StepConfig::SetFlags(_), Some(PrAction::Closed)) => false,
                _ => true,
            },
        }
    }

    pub async fn apply(
        &self,
        envelope: &Envelope,
        ctx: &StepContext<'_>,
    ) -> Result<StepReport, StepError> {
        match self {
            StepConfig::BranchPackage(cfg) => branch::apply(cfg, envelope, ctx).await,
            StepConfig::LinkPackage(cfg) => link::apply(cfg, envelope, ctx).await,
            StepConfig::ConfigureRepositories(cfg) => configure::apply(cfg, envelope, ctx).await,
            StepConfig::RebuildPackage(cfg) => rebuild::apply(cfg, envelope, ctx).await,
            StepConfig::SetFlags(cfg) => set_flags::apply(cfg, envelope, ctx).await,
            StepConfig::SubmitRequest(cfg) => submit::apply(cfg, envelope, ctx).await,
        }
    }
}
