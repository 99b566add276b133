//! Set-flags step: apply build/publish/debuginfo flags to fixed packages.

use crate::automation::steps::{StepContext, StepError, StepReport};
use crate::backend::PackageRef;
use crate::config::workflows::SetFlagsConfig;
use crate::scm::Envelope;

pub(crate) async fn apply(
    cfg: &SetFlagsConfig,
    _envelope: &Envelope,
    ctx: &StepContext<'_>,
) -> Result<StepReport, StepError> {
    for entry in &cfg.flags {
        let package = PackageRef::new(&entry.project, &entry.package);
        ctx.backend.set_flag(ctx.actor, &package, &entry.flag).await?;
    }
    Ok(StepReport::message(format!(
        "set {} flags",
        cfg.flags.len()
    )))
}
