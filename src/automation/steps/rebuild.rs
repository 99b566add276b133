//! Trigger-build step: ask the backend to rebuild a fixed package.

use crate::automation::steps::{StepContext, StepError, StepReport};
use crate::backend::PackageRef;
use crate::config::workflows::RebuildStepConfig;
use crate::scm::Envelope;

pub(crate) async fn apply(
    cfg: &RebuildStepConfig,
    _envelope: &Envelope,
    ctx: &StepContext<'_>,
) -> Result<StepReport, StepError> {
    let package = PackageRef::new(&cfg.project, &cfg.package);
    ctx.backend.rebuild(ctx.actor, &package).await?;
    Ok(StepReport::message(format!("rebuild triggered for {}", package)))
}
