use wiremock::matchers::{body_partial_json, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use packflow::scm::{CommitState, HttpStatusReporter, ReporterError, StatusReporter};

mod common;
use common::{pr_envelope, push_envelope};
use packflow::scm::{PrAction, ScmProvider};

#[tokio::test]
async fn test_github_status_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/repos/octo/hello/statuses/deadbeefcafe0123456789",
        ))
        .and(body_partial_json(serde_json::json!({
            "state": "pending",
            "context": "packflow/workflow",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let reporter = HttpStatusReporter::new("secret", 5).unwrap();
    let mut envelope = pr_envelope(PrAction::Opened, 12);
    envelope.api_endpoint = server.uri();

    reporter
        .report(&envelope, CommitState::Pending, "packflow/workflow", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_gitlab_status_post_uses_encoded_project_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/projects/.+/statuses/deadbeefcafe0123456789$"))
        .and(body_partial_json(serde_json::json!({
            "state": "failed",
            "name": "packflow/workflow",
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let reporter = HttpStatusReporter::new("secret", 5).unwrap();
    let mut envelope = push_envelope("deadbeefcafe0123456789");
    envelope.scm = ScmProvider::Gitlab;
    envelope.api_endpoint = server.uri();

    // GitLab has no separate error state; it degrades to failed.
    reporter
        .report(&envelope, CommitState::Error, "packflow/workflow", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unauthorized_is_surfaced_as_non_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let reporter = HttpStatusReporter::new("stale-token", 5).unwrap();
    let mut envelope = pr_envelope(PrAction::Opened, 12);
    envelope.api_endpoint = server.uri();

    let err = reporter
        .report(&envelope, CommitState::Pending, "packflow/workflow", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReporterError::Unauthorized(_)));
}

#[tokio::test]
async fn test_server_error_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let reporter = HttpStatusReporter::new("secret", 5).unwrap();
    let mut envelope = pr_envelope(PrAction::Opened, 12);
    envelope.api_endpoint = server.uri();

    let err = reporter
        .report(&envelope, CommitState::Success, "packflow/workflow", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReporterError::Transport(_)));
}
