use std::sync::Arc;

use packflow::requests::{
    Priority, RequestAction, RequestState, RequestStore, ReviewOutcome, ReviewState, Reviewer,
};
use packflow::PackflowError;

mod common;

fn submit_action() -> RequestAction {
    RequestAction::submit("devel:tools", "ctris", "games", "ctris")
}

#[tokio::test]
async fn test_create_without_reviewers_starts_new() {
    let store = RequestStore::new();
    let request = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();

    assert_eq!(request.state, RequestState::New);
    assert!(request.reviews.is_empty());
}

#[tokio::test]
async fn test_create_with_reviewers_starts_in_review() {
    let store = RequestStore::new();
    let request = store
        .create(
            "alice",
            vec![submit_action()],
            vec![
                Reviewer::User { login: "bob".into() },
                Reviewer::Group { name: "legal".into() },
            ],
            Priority::default(),
        )
        .await
        .unwrap();

    assert_eq!(request.state, RequestState::Review);
    assert_eq!(request.reviews.len(), 2);
    assert!(request.reviews.iter().all(|r| r.state == ReviewState::New));
}

#[tokio::test]
async fn test_state_is_review_iff_open_reviews() {
    let store = RequestStore::new();
    let request = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();
    let number = request.number;

    // Adding a review flips to review.
    let review_id = store
        .update(number, |req| {
            req.add_review(Reviewer::User { login: "bob".into() }, None, "alice")
        })
        .await
        .unwrap();
    assert_eq!(store.get(number).await.unwrap().state, RequestState::Review);

    // Resolving the last review flips back to new, never to accepted.
    store
        .update(number, |req| {
            req.resolve_review(review_id, ReviewOutcome::Accepted, None)
        })
        .await
        .unwrap();
    assert_eq!(store.get(number).await.unwrap().state, RequestState::New);
}

#[tokio::test]
async fn test_accept_on_terminal_request_is_state_violation() {
    let store = RequestStore::new();
    let request = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();
    let number = request.number;

    store
        .update(number, |req| req.decline("not wanted", "maintainer"))
        .await
        .unwrap();

    let result = store
        .update(number, |req| req.accept("maintainer", false))
        .await;
    assert!(matches!(result, Err(PackflowError::StateViolation(_))));
}

#[tokio::test]
async fn test_concurrent_review_resolutions_both_survive() {
    let store = Arc::new(RequestStore::new());
    let request = store
        .create(
            "alice",
            vec![submit_action()],
            vec![
                Reviewer::User { login: "bob".into() },
                Reviewer::Group { name: "legal".into() },
            ],
            Priority::default(),
        )
        .await
        .unwrap();
    let number = request.number;
    let first_id = request.reviews[0].id;
    let second_id = request.reviews[1].id;

    let store_a = store.clone();
    let store_b = store.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move {
            store_a
                .update(number, |req| {
                    req.resolve_review(first_id, ReviewOutcome::Accepted, None)
                })
                .await
        }),
        tokio::spawn(async move {
            store_b
                .update(number, |req| {
                    req.resolve_review(second_id, ReviewOutcome::Declined, Some("nope".into()))
                })
                .await
        }),
    );
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    // Both resolutions landed and the recomputation saw both.
    let request = store.get(number).await.unwrap();
    assert_eq!(request.state, RequestState::New);
    assert_eq!(request.reviews[0].state, ReviewState::Accepted);
    assert_eq!(request.reviews[1].state, ReviewState::Declined);
}

#[tokio::test]
async fn test_reopen_after_decline() {
    let store = RequestStore::new();
    let request = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();
    let number = request.number;

    store
        .update(number, |req| req.decline("later", "maintainer"))
        .await
        .unwrap();
    store.update(number, |req| req.reopen("alice")).await.unwrap();

    assert_eq!(store.get(number).await.unwrap().state, RequestState::New);
}

#[tokio::test]
async fn test_obsolete_reviews_when_target_disappears() {
    let store = RequestStore::new();
    let request = store
        .create(
            "alice",
            vec![submit_action()],
            vec![Reviewer::Project { project: "games".into() }],
            Priority::default(),
        )
        .await
        .unwrap();
    let number = request.number;
    assert_eq!(request.state, RequestState::Review);

    let changed = store.obsolete_reviews_for_target("games", None).await.unwrap();
    assert_eq!(changed, vec![number]);

    let request = store.get(number).await.unwrap();
    assert_eq!(request.reviews[0].state, ReviewState::Obsoleted);
    assert_eq!(request.state, RequestState::New);
}

#[tokio::test]
async fn test_superseded_requests_excluded_from_active_listing() {
    let store = RequestStore::new();
    let old = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();
    let new = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();

    store
        .update(old.number, |req| req.supersede(new.number))
        .await
        .unwrap();

    let active = store.list_active().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].number, new.number);

    let old = store.get(old.number).await.unwrap();
    assert_eq!(old.state, RequestState::Superseded);
    assert_eq!(old.superseded_by, Some(new.number));
}

#[tokio::test]
async fn test_add_review_on_terminal_request_rejected() {
    let store = RequestStore::new();
    let request = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();
    store
        .update(request.number, |req| req.revoke("obsolete", "alice"))
        .await
        .unwrap();

    let result = store
        .update(request.number, |req| {
            req.add_review(Reviewer::User { login: "bob".into() }, None, "alice")
        })
        .await;
    assert!(matches!(result, Err(PackflowError::StateViolation(_))));
}

#[tokio::test]
async fn test_request_numbers_are_unique_and_increasing() {
    let store = RequestStore::new();
    let first = store
        .create("alice", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();
    let second = store
        .create("bob", vec![submit_action()], vec![], Priority::default())
        .await
        .unwrap();

    assert!(second.number > first.number);
}
