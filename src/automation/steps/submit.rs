//! Submit-request step: once content lands on a branch or tag, open a
//! change request submitting it to the configured destination. Reuses an
//! already open request for the same source and target, and supersedes
//! older open requests against the same destination.

use tracing::info;

use crate::automation::steps::{StepContext, StepError, StepReport};
use crate::config::workflows::SubmitRequestConfig;
use crate::requests::{Priority, RequestAction};
use crate::scm::Envelope;

pub(crate) async fn apply(
    cfg: &SubmitRequestConfig,
    envelope: &Envelope,
    ctx: &StepContext<'_>,
) -> Result<StepReport, StepError> {
    let target_package = cfg
        .target_package
        .clone()
        .unwrap_or_else(|| cfg.source_package.clone());

    if let Some(existing) = ctx
        .requests
        .find_open_submit(
            &cfg.source_project,
            &cfg.source_package,
            &cfg.target_project,
            &target_package,
        )
        .await
    {
        return Ok(StepReport::message(format!(
            "request {} already open for {}/{}",
            existing, cfg.target_project, target_package
        )));
    }

    let action = RequestAction::submit(
        &cfg.source_project,
        &cfg.source_package,
        &cfg.target_project,
        &target_package,
    );
    let request = ctx
        .requests
        .create(ctx.actor, vec![action], Vec::new(), Priority::default())
        .await?;

    let superseded = ctx
        .requests
        .supersede_open_submits(&cfg.target_project, &target_package, request.number)
        .await?;

    info!(
        "Created request {} for {} ({})",
        request.number,
        cfg.source_package,
        envelope
            .tag_name
            .as_deref()
            .unwrap_or(&envelope.commit_sha)
    );

    let message = if superseded.is_empty() {
        format!("created request {}", request.number)
    } else {
        format!(
            "created request {}, superseded {}",
            request.number,
            superseded
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    Ok(StepReport::message(message))
}
