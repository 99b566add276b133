//! Configure-repositories step: keep the repository and architecture
//! associations of the event's target project pointing at the configured
//! build targets.

use crate::automation::steps::{StepContext, StepError, StepReport};
use crate::automation::target::{pr_target_project, repo_target_project};
use crate::config::workflows::ConfigureRepositoriesConfig;
use crate::scm::{Envelope, EventKind, PrAction};

pub(crate) async fn apply(
    cfg: &ConfigureRepositoriesConfig,
    envelope: &Envelope,
    ctx: &StepContext<'_>,
) -> Result<StepReport, StepError> {
    let project = match envelope.event {
        EventKind::PullRequest => pr_target_project(
            &cfg.target_project,
            &envelope.target_repository_full_name,
            envelope.pr_number.unwrap_or(0),
        ),
        EventKind::Push | EventKind::TagPush => {
            repo_target_project(&cfg.target_project, &envelope.target_repository_full_name)
        }
    };

    if envelope.event == EventKind::PullRequest && envelope.action == Some(PrAction::Closed) {
        let names: Vec<String> = cfg.repositories.iter().map(|r| r.name.clone()).collect();
        ctx.backend
            .remove_repositories(ctx.actor, &project, &names)
            .await?;
        return Ok(StepReport::message(format!(
            "removed {} repositories from {}",
            names.len(),
            project
        )));
    }

    ctx.backend
        .configure_repositories(ctx.actor, &project, &cfg.repositories)
        .await?;
    Ok(StepReport::message(format!(
        "configured {} repositories on {}",
        cfg.repositories.len(),
        project
    )))
}
