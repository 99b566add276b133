//! Deterministic target naming.
//!
//! Target identity is derived from the event content, never from a
//! counter: pull request targets embed the PR number, push targets the
//! truncated commit sha, tag targets the tag name. Recomputing the name
//! for a redelivered envelope yields the identical string, which is what
//! makes the automation steps idempotent.

use crate::backend::PackageRef;
use crate::scm::{Envelope, EventKind};

/// Commit shas are truncated to this length in target names.
pub const SHORT_SHA_LEN: usize = 12;

/// Project and package names allow a conservative character set; anything
/// else (notably the `/` in repository full names) becomes a dash.
pub fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Container project for one pull request:
/// `{prefix}:{sanitized repo}:PR-{number}`.
pub fn pr_target_project(prefix: &str, repo_full_name: &str, pr_number: u64) -> String {
    format!(
        "{}:{}:PR-{}",
        prefix,
        sanitize_segment(repo_full_name),
        pr_number
    )
}

/// Container project for push and tag events: `{prefix}:{sanitized repo}`.
pub fn repo_target_project(prefix: &str, repo_full_name: &str) -> String {
    format!("{}:{}", prefix, sanitize_segment(repo_full_name))
}

pub fn push_target_package(source_package: &str, commit_sha: &str) -> String {
    let short = &commit_sha[..SHORT_SHA_LEN.min(commit_sha.len())];
    format!("{}-{}", source_package, short)
}

pub fn tag_target_package(source_package: &str, tag_name: &str) -> String {
    format!("{}-{}", source_package, sanitize_segment(tag_name))
}

/// The full target identity for a branch/link step, per event kind.
pub fn step_target(
    envelope: &Envelope,
    target_project_prefix: &str,
    source_package: &str,
) -> PackageRef {
    match envelope.event {
        EventKind::PullRequest => PackageRef::new(
            &pr_target_project(
                target_project_prefix,
                &envelope.target_repository_full_name,
                envelope.pr_number.unwrap_or(0),
            ),
            source_package,
        ),
        EventKind::Push => PackageRef::new(
            &repo_target_project(target_project_prefix, &envelope.target_repository_full_name),
            &push_target_package(source_package, &envelope.commit_sha),
        ),
        EventKind::TagPush => PackageRef::new(
            &repo_target_project(target_project_prefix, &envelope.target_repository_full_name),
            &tag_target_package(
                source_package,
                envelope.tag_name.as_deref().unwrap_or_default(),
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pr_target_is_deterministic() {
        let first = pr_target_project("home:bot:ci", "octo/hello", 42);
        let second = pr_target_project("home:bot:ci", "octo/hello", 42);
        assert_eq!(first, second);
        assert_eq!(first, "home:bot:ci:octo-hello:PR-42");
    }

    #[test]
    fn test_push_target_truncates_sha() {
        let name = push_target_package("ctris", "deadbeefcafe0123456789");
        assert_eq!(name, "ctris-deadbeefcafe");
        // Shorter shas are used as-is.
        assert_eq!(push_target_package("ctris", "abc"), "ctris-abc");
    }

    #[test]
    fn test_tag_target_sanitizes() {
        assert_eq!(tag_target_package("ctris", "v1.2.0"), "ctris-v1.2.0");
        assert_eq!(tag_target_package("ctris", "release/1"), "ctris-release-1");
    }

    #[test]
    fn test_sanitize_keeps_safe_chars() {
        assert_eq!(sanitize_segment("octo/hello_world-1.0"), "octo-hello_world-1.0");
    }
}
