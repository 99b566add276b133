use serde_json::json;

use packflow::scm::{Envelope, EventKind, PrAction, ScmProvider};

mod common;

const GITHUB_API: &str = "https://api.github.com";
const GITLAB_API: &str = "https://gitlab.com/api/v4";

fn github_pr_payload(action: &str, merged: bool) -> serde_json::Value {
    json!({
        "action": action,
        "number": 12,
        "pull_request": {
            "number": 12,
            "merged": merged,
            "head": {
                "sha": "deadbeefcafe0123456789",
                "ref": "feature",
                "repo": { "full_name": "forker/hello" }
            },
            "base": { "ref": "main" }
        },
        "repository": { "full_name": "octo/hello" }
    })
}

#[test]
fn test_github_pull_request_opened() {
    let envelope = Envelope::from_github("pull_request", &github_pr_payload("opened", false), GITHUB_API)
        .unwrap()
        .unwrap();

    assert_eq!(envelope.scm, ScmProvider::Github);
    assert_eq!(envelope.event, EventKind::PullRequest);
    assert_eq!(envelope.action, Some(PrAction::Opened));
    assert!(!envelope.merged);
    assert_eq!(envelope.commit_sha, "deadbeefcafe0123456789");
    assert_eq!(envelope.source_repository_full_name, "forker/hello");
    assert_eq!(envelope.target_repository_full_name, "octo/hello");
    assert_eq!(envelope.source_branch, "feature");
    assert_eq!(envelope.target_branch, "main");
    assert_eq!(envelope.pr_number, Some(12));
    assert!(envelope.validate().is_ok());
}

#[test]
fn test_github_synchronize_maps_to_updated() {
    let envelope =
        Envelope::from_github("pull_request", &github_pr_payload("synchronize", false), GITHUB_API)
            .unwrap()
            .unwrap();
    assert_eq!(envelope.action, Some(PrAction::Updated));
}

#[test]
fn test_github_closed_carries_merged_flag() {
    let envelope =
        Envelope::from_github("pull_request", &github_pr_payload("closed", true), GITHUB_API)
            .unwrap()
            .unwrap();
    assert_eq!(envelope.action, Some(PrAction::Closed));
    assert!(envelope.merged);

    let unmerged =
        Envelope::from_github("pull_request", &github_pr_payload("closed", false), GITHUB_API)
            .unwrap()
            .unwrap();
    assert!(!unmerged.merged);
}

#[test]
fn test_github_irrelevant_action_is_ignored() {
    let ignored =
        Envelope::from_github("pull_request", &github_pr_payload("labeled", false), GITHUB_API)
            .unwrap();
    assert!(ignored.is_none());

    let unknown_event = Envelope::from_github("issues", &json!({}), GITHUB_API).unwrap();
    assert!(unknown_event.is_none());
}

#[test]
fn test_github_branch_push() {
    let payload = json!({
        "ref": "refs/heads/main",
        "after": "deadbeefcafe0123456789",
        "repository": { "full_name": "octo/hello" }
    });

    let envelope = Envelope::from_github("push", &payload, GITHUB_API)
        .unwrap()
        .unwrap();
    assert_eq!(envelope.event, EventKind::Push);
    assert_eq!(envelope.source_branch, "main");
    assert_eq!(envelope.tag_name, None);
    assert!(envelope.validate().is_ok());
}

#[test]
fn test_github_tag_push() {
    let payload = json!({
        "ref": "refs/tags/v1.2.0",
        "after": "deadbeefcafe0123456789",
        "repository": { "full_name": "octo/hello" }
    });

    let envelope = Envelope::from_github("push", &payload, GITHUB_API)
        .unwrap()
        .unwrap();
    assert_eq!(envelope.event, EventKind::TagPush);
    assert_eq!(envelope.tag_name, Some("v1.2.0".to_string()));
    assert!(envelope.validate().is_ok());
}

#[test]
fn test_github_ref_deletion_is_ignored() {
    let payload = json!({
        "ref": "refs/heads/feature",
        "after": "0000000000000000000000000000000000000000",
        "repository": { "full_name": "octo/hello" }
    });

    assert!(Envelope::from_github("push", &payload, GITHUB_API)
        .unwrap()
        .is_none());
}

#[test]
fn test_github_malformed_payload_is_rejected() {
    // A pull_request action without the pull_request object.
    let payload = json!({ "action": "opened" });
    assert!(Envelope::from_github("pull_request", &payload, GITHUB_API).is_err());
}

fn gitlab_mr_payload(action: &str) -> serde_json::Value {
    json!({
        "object_kind": "merge_request",
        "object_attributes": {
            "iid": 5,
            "action": action,
            "source_branch": "feature",
            "target_branch": "main",
            "last_commit": { "id": "deadbeefcafe0123456789" },
            "source": { "path_with_namespace": "forker/hello" },
            "target": { "path_with_namespace": "octo/hello" }
        }
    })
}

#[test]
fn test_gitlab_merge_request_open() {
    let envelope = Envelope::from_gitlab(&gitlab_mr_payload("open"), GITLAB_API)
        .unwrap()
        .unwrap();

    assert_eq!(envelope.scm, ScmProvider::Gitlab);
    assert_eq!(envelope.event, EventKind::PullRequest);
    assert_eq!(envelope.action, Some(PrAction::Opened));
    assert_eq!(envelope.pr_number, Some(5));
    assert!(envelope.validate().is_ok());
}

#[test]
fn test_gitlab_merge_maps_to_closed_merged() {
    let envelope = Envelope::from_gitlab(&gitlab_mr_payload("merge"), GITLAB_API)
        .unwrap()
        .unwrap();
    assert_eq!(envelope.action, Some(PrAction::Closed));
    assert!(envelope.merged);
}

#[test]
fn test_gitlab_push() {
    let payload = json!({
        "object_kind": "push",
        "ref": "refs/heads/main",
        "checkout_sha": "deadbeefcafe0123456789",
        "project": { "path_with_namespace": "octo/hello" }
    });

    let envelope = Envelope::from_gitlab(&payload, GITLAB_API)
        .unwrap()
        .unwrap();
    assert_eq!(envelope.event, EventKind::Push);
    assert_eq!(envelope.source_branch, "main");
}

#[test]
fn test_gitlab_tag_push() {
    let payload = json!({
        "object_kind": "tag_push",
        "ref": "refs/tags/v1.2.0",
        "checkout_sha": "deadbeefcafe0123456789",
        "project": { "path_with_namespace": "octo/hello" }
    });

    let envelope = Envelope::from_gitlab(&payload, GITLAB_API)
        .unwrap()
        .unwrap();
    assert_eq!(envelope.event, EventKind::TagPush);
    assert_eq!(envelope.tag_name, Some("v1.2.0".to_string()));
}

#[test]
fn test_gitlab_push_without_checkout_sha_is_ignored() {
    // Branch deletions deliver a null checkout_sha.
    let payload = json!({
        "object_kind": "push",
        "ref": "refs/heads/feature",
        "checkout_sha": null,
        "project": { "path_with_namespace": "octo/hello" }
    });

    assert!(Envelope::from_gitlab(&payload, GITLAB_API).unwrap().is_none());
}

#[test]
fn test_envelope_validation_catches_missing_fields() {
    let mut envelope = common::pr_envelope(PrAction::Opened, 12);
    envelope.commit_sha = String::new();
    assert!(envelope.validate().is_err());

    let mut envelope = common::tag_envelope("v1.0.0");
    envelope.tag_name = None;
    assert!(envelope.validate().is_err());
}
