//! Normalized event envelope.
//!
//! Providers deliver differently shaped payloads for the same logical
//! events; everything downstream of the webhook handlers works on this one
//! shape. Authentication of the delivery happens before normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::PackflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScmProvider {
    Github,
    Gitlab,
}

impl fmt::Display for ScmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Github => write!(f, "github"),
            Self::Gitlab => write!(f, "gitlab"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    TagPush,
    PullRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    Updated,
    Closed,
    Reopened,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub scm: ScmProvider,
    pub event: EventKind,
    pub action: Option<PrAction>,
    /// Derived for closed pull requests: true when the PR was merged.
    pub merged: bool,
    pub commit_sha: String,
    pub source_repository_full_name: String,
    pub target_repository_full_name: String,
    pub source_branch: String,
    pub target_branch: String,
    pub pr_number: Option<u64>,
    pub tag_name: Option<String>,
    pub api_endpoint: String,
}

impl Envelope {
    /// Reject structurally incomplete envelopes before any mutation runs.
    pub fn validate(&self) -> Result<(), PackflowError> {
        if self.commit_sha.is_empty() {
            return Err(PackflowError::ValidationError(
                "Envelope is missing a commit sha".to_string(),
            ));
        }
        if self.target_repository_full_name.is_empty() {
            return Err(PackflowError::ValidationError(
                "Envelope is missing the target repository".to_string(),
            ));
        }
        match self.event {
            EventKind::PullRequest => {
                if self.pr_number.is_none() {
                    return Err(PackflowError::ValidationError(
                        "Pull request event without a PR number".to_string(),
                    ));
                }
                if self.action.is_none() {
                    return Err(PackflowError::ValidationError(
                        "Pull request event without an action".to_string(),
                    ));
                }
            }
            EventKind::TagPush => {
                if self.tag_name.is_none() {
                    return Err(PackflowError::ValidationError(
                        "Tag push event without a tag name".to_string(),
                    ));
                }
            }
            EventKind::Push => {}
        }
        Ok(())
    }

    /// Normalize a GitHub delivery. Returns `None` for event/action
    /// combinations the automation engine does not react to.
    pub fn from_github(
        event_name: &str,
        payload: &Value,
        api_endpoint: &str,
    ) -> Result<Option<Envelope>, PackflowError> {
        match event_name {
            "pull_request" => {
                let action = match str_at(payload, &["action"]) {
                    Some("opened") => PrAction::Opened,
                    Some("synchronize") => PrAction::Updated,
                    Some("closed") => PrAction::Closed,
                    Some("reopened") => PrAction::Reopened,
                    _ => return Ok(None),
                };

                let merged = payload
                    .pointer("/pull_request/merged")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                Ok(Some(Envelope {
                    scm: ScmProvider::Github,
                    event: EventKind::PullRequest,
                    action: Some(action),
                    merged: action == PrAction::Closed && merged,
                    commit_sha: required(payload, "/pull_request/head/sha")?,
                    source_repository_full_name: required(
                        payload,
                        "/pull_request/head/repo/full_name",
                    )?,
                    target_repository_full_name: required(payload, "/repository/full_name")?,
                    source_branch: required(payload, "/pull_request/head/ref")?,
                    target_branch: required(payload, "/pull_request/base/ref")?,
                    pr_number: payload
                        .pointer("/pull_request/number")
                        .and_then(Value::as_u64),
                    tag_name: None,
                    api_endpoint: api_endpoint.to_string(),
                }))
            }
            "push" => {
                let git_ref = required(payload, "/ref")?;
                let repo = required(payload, "/repository/full_name")?;
                let after = required(payload, "/after")?;
                // Ref deletions push the null sha; nothing to build.
                if after.chars().all(|c| c == '0') {
                    return Ok(None);
                }

                if let Some(tag) = git_ref.strip_prefix("refs/tags/") {
                    Ok(Some(Envelope {
                        scm: ScmProvider::Github,
                        event: EventKind::TagPush,
                        action: None,
                        merged: false,
                        commit_sha: after,
                        source_repository_full_name: repo.clone(),
                        target_repository_full_name: repo,
                        source_branch: String::new(),
                        target_branch: String::new(),
                        pr_number: None,
                        tag_name: Some(tag.to_string()),
                        api_endpoint: api_endpoint.to_string(),
                    }))
                } else {
                    let branch = git_ref
                        .strip_prefix("refs/heads/")
                        .unwrap_or(git_ref.as_str())
                        .to_string();
                    Ok(Some(Envelope {
                        scm: ScmProvider::Github,
                        event: EventKind::Push,
                        action: None,
                        merged: false,
                        commit_sha: after,
                        source_repository_full_name: repo.clone(),
                        target_repository_full_name: repo,
                        source_branch: branch.clone(),
                        target_branch: branch,
                        pr_number: None,
                        tag_name: None,
                        api_endpoint: api_endpoint.to_string(),
                    }))
                }
            }
            _ => Ok(None),
        }
    }

    /// Normalize a GitLab delivery.
    pub fn from_gitlab(
        payload: &Value,
        api_endpoint: &str,
    ) -> Result<Option<Envelope>, PackflowError> {
        match str_at(payload, &["object_kind"]) {
            Some("merge_request") => {
                let (action, merged) = match payload
                    .pointer("/object_attributes/action")
                    .and_then(Value::as_str)
                {
                    Some("open") => (PrAction::Opened, false),
                    Some("update") => (PrAction::Updated, false),
                    Some("close") => (PrAction::Closed, false),
                    Some("merge") => (PrAction::Closed, true),
                    Some("reopen") => (PrAction::Reopened, false),
                    _ => return Ok(None),
                };

                Ok(Some(Envelope {
                    scm: ScmProvider::Gitlab,
                    event: EventKind::PullRequest,
                    action: Some(action),
                    merged,
                    commit_sha: required(payload, "/object_attributes/last_commit/id")?,
                    source_repository_full_name: required(
                        payload,
                        "/object_attributes/source/path_with_namespace",
                    )?,
                    target_repository_full_name: required(
                        payload,
                        "/object_attributes/target/path_with_namespace",
                    )?,
                    source_branch: required(payload, "/object_attributes/source_branch")?,
                    target_branch: required(payload, "/object_attributes/target_branch")?,
                    pr_number: payload
                        .pointer("/object_attributes/iid")
                        .and_then(Value::as_u64),
                    tag_name: None,
                    api_endpoint: api_endpoint.to_string(),
                }))
            }
            Some(kind @ ("push" | "tag_push")) => {
                let Some(sha) = str_at(payload, &["checkout_sha"]) else {
                    // Ref deletion.
                    return Ok(None);
                };
                let git_ref = required(payload, "/ref")?;
                let repo = required(payload, "/project/path_with_namespace")?;

                if kind == "tag_push" {
                    let tag = git_ref
                        .strip_prefix("refs/tags/")
                        .unwrap_or(git_ref.as_str())
                        .to_string();
                    Ok(Some(Envelope {
                        scm: ScmProvider::Gitlab,
                        event: EventKind::TagPush,
                        action: None,
                        merged: false,
                        commit_sha: sha.to_string(),
                        source_repository_full_name: repo.clone(),
                        target_repository_full_name: repo,
                        source_branch: String::new(),
                        target_branch: String::new(),
                        pr_number: None,
                        tag_name: Some(tag),
                        api_endpoint: api_endpoint.to_string(),
                    }))
                } else {
                    let branch = git_ref
                        .strip_prefix("refs/heads/")
                        .unwrap_or(git_ref.as_str())
                        .to_string();
                    Ok(Some(Envelope {
                        scm: ScmProvider::Gitlab,
                        event: EventKind::Push,
                        action: None,
                        merged: false,
                        commit_sha: sha.to_string(),
                        source_repository_full_name: repo.clone(),
                        target_repository_full_name: repo,
                        source_branch: branch.clone(),
                        target_branch: branch,
                        pr_number: None,
                        tag_name: None,
                        api_endpoint: api_endpoint.to_string(),
                    }))
                }
            }
            _ => Ok(None),
        }
    }
}

fn str_at<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = payload;
    for key in path {
        current = current.get(key)?;
    }
    current.as_str()
}

fn required(payload: &Value, pointer: &str) -> Result<String, PackflowError> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PackflowError::WebhookError(format!("Payload is missing {}", pointer))
        })
}
