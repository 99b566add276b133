//! Link step: create the deterministic target package and point a link
//! file at the configured source instead of copying sources over.

use tracing::info;

use crate::automation::steps::{StepContext, StepError, StepReport};
use crate::automation::target::step_target;
use crate::backend::{BackendError, PackageRef};
use crate::config::workflows::LinkStepConfig;
use crate::scm::{Envelope, EventKind, PrAction};

pub(crate) async fn apply(
    cfg: &LinkStepConfig,
    envelope: &Envelope,
    ctx: &StepContext<'_>,
) -> Result<StepReport, StepError> {
    let source = PackageRef::new(&cfg.source_project, &cfg.source_package);
    let target = step_target(envelope, &cfg.target_project, &cfg.source_package);

    match (envelope.event, envelope.action) {
        (EventKind::PullRequest, Some(PrAction::Closed)) => {
            match ctx
                .backend
                .soft_delete_project(ctx.actor, &target.project)
                .await
            {
                Ok(()) => {}
                Err(BackendError::NotFound(_)) => {
                    return Ok(StepReport::message(format!(
                        "nothing to delete for {}",
                        target.project
                    )));
                }
                Err(err) => return Err(err.into()),
            }
            ctx.subscriptions.remove_subscriptions(&target).await?;
            Ok(StepReport::message(format!(
                "soft-deleted {}",
                target.project
            )))
        }
        (EventKind::PullRequest, Some(PrAction::Reopened)) => {
            ctx.backend
                .restore_project(ctx.actor, &target.project)
                .await?;
            ctx.subscriptions.ensure_subscriptions(&target).await?;
            Ok(StepReport::with_target(
                format!("restored {}", target.project),
                target,
            ))
        }
        _ => {
            // Lookup before create: redelivered events reuse the package.
            let existed = ctx.backend.package_exists(&target).await?;
            if !existed {
                ctx.backend.create_package(ctx.actor, &target).await?;
            }
            ctx.backend.write_link(ctx.actor, &source, &target).await?;
            ctx.subscriptions.ensure_subscriptions(&target).await?;

            let message = if existed {
                format!("refreshed link {} -> {}", target, source)
            } else {
                info!("Linked {} into {}", source, target);
                format!("linked {} into {}", source, target)
            };
            Ok(StepReport::with_target(message, target))
        }
    }
}
