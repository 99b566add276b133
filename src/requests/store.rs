//! In-memory request store.
//!
//! All state is held in memory and lost on restart; the durable query layer
//! lives behind the service boundary. Writes go through an optimistic
//! version check with retry so that review resolution and request-state
//! recomputation stay atomic per request: concurrent resolutions of
//! different assignments both survive and the final recomputation sees both.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::PackflowError;
use crate::requests::types::{
    ActionKind, ChangeRequest, Priority, RequestAction, RequestState, Reviewer,
};

pub struct RequestStore {
    requests: RwLock<HashMap<u64, ChangeRequest>>,
    next_number: AtomicU64,
}

impl RequestStore {
    pub fn new() -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            next_number: AtomicU64::new(1),
        }
    }

    /// Create a request in `new`, or `review` when reviewers are given.
    pub async fn create(
        &self,
        creator: &str,
        actions: Vec<RequestAction>,
        reviewers: Vec<Reviewer>,
        priority: Priority,
    ) -> Result<ChangeRequest, PackflowError> {
        if actions.is_empty() {
            return Err(PackflowError::ValidationError(
                "A request needs at least one action".to_string(),
            ));
        }

        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let mut request = ChangeRequest::new(number, creator, actions, priority);
        for reviewer in reviewers {
            request.add_review(reviewer, None, creator)?;
        }

        let mut requests = self.requests.write().await;
        requests.insert(number, request.clone());
        debug!("Created request {} by {}", number, creator);
        Ok(request)
    }

    pub async fn get(&self, number: u64) -> Option<ChangeRequest> {
        let requests = self.requests.read().await;
        requests.get(&number).cloned()
    }

    /// All requests except superseded ones, ordered by number.
    pub async fn list_active(&self) -> Vec<ChangeRequest> {
        let requests = self.requests.read().await;
        let mut active: Vec<ChangeRequest> = requests
            .values()
            .filter(|r| r.state != RequestState::Superseded)
            .cloned()
            .collect();
        active.sort_by_key(|r| r.number);
        active
    }

    /// Read-modify-write under an optimistic version check.
    ///
    /// The closure runs against a snapshot; the write only lands when the
    /// stored version still matches, otherwise the closure is re-applied to
    /// the fresh state.
    pub async fn update<T, F>(&self, number: u64, mut mutate: F) -> Result<T, PackflowError>
    where
        F: FnMut(&mut ChangeRequest) -> Result<T, PackflowError>,
    {
        loop {
            let snapshot = {
                let requests = self.requests.read().await;
                requests
                    .get(&number)
                    .cloned()
                    .ok_or_else(|| PackflowError::NotFound(format!("Request {}", number)))?
            };

            let mut candidate = snapshot.clone();
            let out = mutate(&mut candidate)?;

            let mut requests = self.requests.write().await;
            let current_version = requests.get(&number).map(|r| r.version);
            match current_version {
                Some(version) if version == snapshot.version => {
                    candidate.version = version + 1;
                    candidate.updated_at = Utc::now();
                    requests.insert(number, candidate);
                    return Ok(out);
                }
                Some(_) => {
                    debug!("Version conflict updating request {}, retrying", number);
                    continue;
                }
                None => {
                    return Err(PackflowError::NotFound(format!("Request {}", number)));
                }
            }
        }
    }

    /// Find an open (non-terminal) submit request for the given source and
    /// target, used by the automation engine to reuse instead of duplicate.
    pub async fn find_open_submit(
        &self,
        source_project: &str,
        source_package: &str,
        target_project: &str,
        target_package: &str,
    ) -> Option<u64> {
        let requests = self.requests.read().await;
        requests
            .values()
            .filter(|r| !r.state.is_terminal())
            .find(|r| {
                r.actions.iter().any(|a| {
                    a.kind == ActionKind::Submit
                        && a.source_project.as_deref() == Some(source_project)
                        && a.source_package.as_deref() == Some(source_package)
                        && a.target_project == target_project
                        && a.target_package.as_deref() == Some(target_package)
                })
            })
            .map(|r| r.number)
    }

    /// Supersede every open submit request targeting the same destination,
    /// excluding `by_number` itself. Returns the superseded numbers.
    pub async fn supersede_open_submits(
        &self,
        target_project: &str,
        target_package: &str,
        by_number: u64,
    ) -> Result<Vec<u64>, PackflowError> {
        let candidates: Vec<u64> = {
            let requests = self.requests.read().await;
            requests
                .values()
                .filter(|r| r.number != by_number && !r.state.is_terminal())
                .filter(|r| {
                    r.actions.iter().any(|a| {
                        a.kind == ActionKind::Submit
                            && a.target_project == target_project
                            && a.target_package.as_deref() == Some(target_package)
                    })
                })
                .map(|r| r.number)
                .collect()
        };

        for number in &candidates {
            self.update(*number, |req| req.supersede(by_number)).await?;
        }
        Ok(candidates)
    }

    /// Side-effect sweep: a project (or package) disappeared, so every open
    /// by-project/by-package review pointing at it becomes obsoleted.
    /// Returns the numbers of requests that changed.
    pub async fn obsolete_reviews_for_target(
        &self,
        project: &str,
        package: Option<&str>,
    ) -> Result<Vec<u64>, PackflowError> {
        let candidates: Vec<u64> = {
            let requests = self.requests.read().await;
            requests
                .values()
                .filter(|r| !r.state.is_terminal())
                .filter(|r| {
                    r.reviews.iter().any(|rev| {
                        rev.state == crate::requests::types::ReviewState::New
                            && rev.reviewer.targets(project, package)
                    })
                })
                .map(|r| r.number)
                .collect()
        };

        let mut changed = Vec::new();
        for number in &candidates {
            let n = self
                .update(*number, |req| Ok(req.obsolete_reviews_for(project, package)))
                .await?;
            if n > 0 {
                changed.push(*number);
            }
        }
        Ok(changed)
    }
}

impl Default for RequestStore {
    fn default() -> Self {
        Self::new()
    }
}
