//! Branch step: branch the configured source into a target derived from
//! the event, and keep build-result subscriptions in step with the target
//! lifecycle.

use tracing::info;

use crate::automation::steps::{StepContext, StepError, StepReport};
use crate::automation::target::step_target;
use crate::backend::{BackendError, BranchOutcome, PackageRef};
use crate::config::workflows::BranchStepConfig;
use crate::scm::{Envelope, EventKind, PrAction};

pub(crate) async fn apply(
    cfg: &BranchStepConfig,
    envelope: &Envelope,
    ctx: &StepContext<'_>,
) -> Result<StepReport, StepError> {
    let source = PackageRef::new(&cfg.source_project, &cfg.source_package);
    let target = step_target(envelope, &cfg.target_project, &cfg.source_package);

    match (envelope.event, envelope.action) {
        (EventKind::PullRequest, Some(PrAction::Closed)) => {
            close_target(envelope, ctx, &target).await
        }
        (EventKind::PullRequest, Some(PrAction::Reopened)) => {
            ctx.backend
                .restore_project(ctx.actor, &target.project)
                .await?;
            ctx.subscriptions.ensure_subscriptions(&target).await?;
            info!("Restored {} for reopened PR", target.project);
            Ok(StepReport::with_target(
                format!("restored {}", target.project),
                target,
            ))
        }
        _ => branch_into(envelope, ctx, &source, &target).await,
    }
}

async fn branch_into(
    envelope: &Envelope,
    ctx: &StepContext<'_>,
    source: &PackageRef,
    target: &PackageRef,
) -> Result<StepReport, StepError> {
    let outcome = ctx
        .backend
        .branch_package(ctx.actor, source, target)
        .await?;

    // The marker records what this automated target was created for; it is
    // refreshed on every redelivered or updated event.
    let note = match envelope.event {
        EventKind::PullRequest => format!(
            "PR {} from {}",
            envelope.pr_number.unwrap_or(0),
            envelope.source_repository_full_name
        ),
        EventKind::Push => format!("commit {}", envelope.commit_sha),
        EventKind::TagPush => format!(
            "tag {}",
            envelope.tag_name.as_deref().unwrap_or_default()
        ),
    };
    ctx.backend.write_branch_marker(target, &note).await?;
    ctx.subscriptions.ensure_subscriptions(target).await?;

    let message = match outcome {
        BranchOutcome::Created => format!("branched {} into {}", source, target),
        BranchOutcome::ReusedExisting => format!("reused existing branch {}", target),
    };
    Ok(StepReport::with_target(message, target.clone()))
}

async fn close_target(
    _envelope: &Envelope,
    ctx: &StepContext<'_>,
    target: &PackageRef,
) -> Result<StepReport, StepError> {
    match ctx
        .backend
        .soft_delete_project(ctx.actor, &target.project)
        .await
    {
        Ok(()) => {}
        // A close for a PR that was never branched has nothing to delete;
        // redeliveries land here too.
        Err(BackendError::NotFound(_)) => {
            return Ok(StepReport::message(format!(
                "nothing to delete for {}",
                target.project
            )));
        }
        Err(err) => return Err(err.into()),
    }

    ctx.subscriptions.remove_subscriptions(target).await?;
    info!("Soft-deleted {} for closed PR", target.project);
    Ok(StepReport::message(format!(
        "soft-deleted {}",
        target.project
    )))
}
