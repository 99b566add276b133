use packflow::backend::InMemoryBackend;
use packflow::checks::{BuildTarget, CheckState, CheckStore};
use packflow::requests::{Priority, RequestAction, RequestStore, Reviewer};
use packflow::staging::{BatchAggregator, BatchState, StagingStore};

mod common;

struct Setup {
    backend: InMemoryBackend,
    checks: CheckStore,
    requests: RequestStore,
    staging: StagingStore,
    target: BuildTarget,
}

async fn setup() -> Setup {
    Setup {
        backend: InMemoryBackend::new(),
        checks: CheckStore::new(),
        requests: RequestStore::new(),
        staging: StagingStore::new(),
        target: BuildTarget::new("home:staging:A", "standard", Some("x86_64")),
    }
}

fn submit_action() -> RequestAction {
    RequestAction::submit("devel:tools", "ctris", "games", "ctris")
}

impl Setup {
    fn aggregator(&self) -> BatchAggregator<'_> {
        BatchAggregator::new(&self.backend, &self.checks, &self.requests)
    }

    async fn batch_with_one_request(&self) -> (String, u64) {
        self.staging
            .create(
                "staging:A",
                "home:staging:A",
                vec![self.target.clone()],
                "operator",
            )
            .await
            .unwrap();
        let request = self
            .requests
            .create("alice", vec![submit_action()], vec![], Priority::default())
            .await
            .unwrap();
        self.staging
            .stage_request("staging:A", request.number, &self.requests)
            .await
            .unwrap();
        ("staging:A".to_string(), request.number)
    }
}

#[tokio::test]
async fn test_empty_batch_is_empty_regardless_of_check_results() {
    let setup = setup().await;
    setup
        .staging
        .create(
            "staging:A",
            "home:staging:A",
            vec![setup.target.clone()],
            "operator",
        )
        .await
        .unwrap();

    // A failing check result exists, but the batch holds no requests.
    let uuid = setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string()])
        .await;
    setup
        .checks
        .upsert(&uuid, "check_1", CheckState::Failure, None)
        .await;

    let batch = setup.staging.get("staging:A").await.unwrap();
    assert_eq!(setup.aggregator().overall_state(&batch).await, BatchState::Empty);
}

#[tokio::test]
async fn test_missing_required_check_means_testing() {
    let setup = setup().await;
    let (name, _) = setup.batch_with_one_request().await;
    setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string()])
        .await;

    let batch = setup.staging.get(&name).await.unwrap();
    let aggregator = setup.aggregator();
    assert_eq!(aggregator.overall_state(&batch).await, BatchState::Testing);
    assert_eq!(aggregator.missing_checks(&batch).await, vec!["check_1"]);
}

#[tokio::test]
async fn test_current_failure_means_failed() {
    let setup = setup().await;
    let (name, _) = setup.batch_with_one_request().await;
    let uuid = setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string()])
        .await;
    setup
        .checks
        .upsert(&uuid, "check_1", CheckState::Failure, Some("boom".into()))
        .await;

    let batch = setup.staging.get(&name).await.unwrap();
    assert_eq!(setup.aggregator().overall_state(&batch).await, BatchState::Failed);
}

#[tokio::test]
async fn test_stale_failure_degrades_to_testing_not_failed() {
    let setup = setup().await;
    let (name, _) = setup.batch_with_one_request().await;

    // Result recorded against the first build...
    let old_uuid = setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string()])
        .await;
    setup
        .checks
        .upsert(&old_uuid, "check_1", CheckState::Failure, None)
        .await;

    // ...then the target rebuilds and gets a fresh publish uuid.
    setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string()])
        .await;

    let batch = setup.staging.get(&name).await.unwrap();
    let aggregator = setup.aggregator();
    assert_eq!(aggregator.overall_state(&batch).await, BatchState::Testing);
    // The stale result is reported as missing and excluded from checks().
    assert_eq!(aggregator.missing_checks(&batch).await, vec!["check_1"]);
    assert!(aggregator.checks(&batch).await.is_empty());
}

#[tokio::test]
async fn test_pending_check_means_testing() {
    let setup = setup().await;
    let (name, _) = setup.batch_with_one_request().await;
    let uuid = setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string()])
        .await;
    setup
        .checks
        .upsert(&uuid, "check_1", CheckState::Pending, None)
        .await;

    let batch = setup.staging.get(&name).await.unwrap();
    assert_eq!(setup.aggregator().overall_state(&batch).await, BatchState::Testing);
}

#[tokio::test]
async fn test_all_required_checks_green_means_acceptable() {
    let setup = setup().await;
    let (name, _) = setup.batch_with_one_request().await;
    let uuid = setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string(), "check_2".to_string()])
        .await;
    setup
        .checks
        .upsert(&uuid, "check_1", CheckState::Success, None)
        .await;
    setup
        .checks
        .upsert(&uuid, "check_2", CheckState::Success, None)
        .await;

    let batch = setup.staging.get(&name).await.unwrap();
    let aggregator = setup.aggregator();
    assert_eq!(aggregator.overall_state(&batch).await, BatchState::Acceptable);
    assert!(aggregator.missing_checks(&batch).await.is_empty());
    assert_eq!(aggregator.checks(&batch).await.len(), 2);
}

#[tokio::test]
async fn test_revoked_staged_request_means_unacceptable() {
    let setup = setup().await;
    let (name, number) = setup.batch_with_one_request().await;

    // Checks are green, but the staged request was withdrawn.
    let uuid = setup
        .backend
        .set_publish_state(&setup.target, vec!["check_1".to_string()])
        .await;
    setup
        .checks
        .upsert(&uuid, "check_1", CheckState::Success, None)
        .await;
    setup
        .requests
        .update(number, |req| req.revoke("withdrawn", "alice"))
        .await
        .unwrap();

    let batch = setup.staging.get(&name).await.unwrap();
    assert_eq!(
        setup.aggregator().overall_state(&batch).await,
        BatchState::Unacceptable
    );
}

#[tokio::test]
async fn test_unpublished_target_means_testing() {
    let setup = setup().await;
    let (name, _) = setup.batch_with_one_request().await;
    // No publish state recorded for the target at all.

    let batch = setup.staging.get(&name).await.unwrap();
    assert_eq!(setup.aggregator().overall_state(&batch).await, BatchState::Testing);
}

#[tokio::test]
async fn test_missing_reviews_lists_reviewer_and_request() {
    let setup = setup().await;
    setup
        .staging
        .create(
            "staging:A",
            "home:staging:A",
            vec![setup.target.clone()],
            "operator",
        )
        .await
        .unwrap();
    let request = setup
        .requests
        .create(
            "alice",
            vec![submit_action()],
            vec![Reviewer::Group { name: "legal".into() }],
            Priority::default(),
        )
        .await
        .unwrap();
    setup
        .staging
        .stage_request("staging:A", request.number, &setup.requests)
        .await
        .unwrap();

    let batch = setup.staging.get("staging:A").await.unwrap();
    let pending = setup.aggregator().missing_reviews(&batch).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].request_number, request.number);
    assert_eq!(pending[0].reviewer, Reviewer::Group { name: "legal".into() });
}

#[tokio::test]
async fn test_request_staged_in_at_most_one_batch() {
    let setup = setup().await;
    let (_, number) = setup.batch_with_one_request().await;
    setup
        .staging
        .create("staging:B", "home:staging:B", vec![], "operator")
        .await
        .unwrap();

    let result = setup
        .staging
        .stage_request("staging:B", number, &setup.requests)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_delete_batch_only_when_empty() {
    let setup = setup().await;
    let (name, number) = setup.batch_with_one_request().await;

    assert!(setup.staging.delete(&name).await.is_err());

    setup
        .staging
        .unstage_request(&name, number, &setup.requests)
        .await
        .unwrap();
    assert!(setup.staging.delete(&name).await.is_ok());

    // Unstaging cleared the back-reference on the request.
    let request = setup.requests.get(number).await.unwrap();
    assert_eq!(request.staging_batch, None);
}
