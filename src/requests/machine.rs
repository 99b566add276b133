//! Transition rules for a single change request and its review assignments.
//!
//! Every mutation takes an explicit actor; authorization itself is decided
//! by the policy layer before these methods are called. State recomputation
//! is a pure function of the current assignment states, so concurrent
//! resolutions of different assignments converge regardless of order.

use chrono::Utc;

use crate::error::PackflowError;
use crate::requests::types::{
    ChangeRequest, Priority, RequestAction, RequestState, ReviewAssignment, ReviewOutcome,
    ReviewState, Reviewer,
};

impl ChangeRequest {
    pub fn new(number: u64, creator: &str, actions: Vec<RequestAction>, priority: Priority) -> Self {
        let now = Utc::now();
        Self {
            number,
            state: RequestState::New,
            actions,
            creator: creator.to_string(),
            priority,
            staging_batch: None,
            reviews: Vec::new(),
            superseded_by: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn has_open_reviews(&self) -> bool {
        self.reviews.iter().any(|r| r.state == ReviewState::New)
    }

    /// Append a review gate. Fails on terminal requests.
    pub fn add_review(
        &mut self,
        reviewer: Reviewer,
        reason: Option<String>,
        actor: &str,
    ) -> Result<u64, PackflowError> {
        if self.state.is_terminal() {
            return Err(PackflowError::StateViolation(format!(
                "Cannot add review to request {} in state {}",
                self.number, self.state
            )));
        }

        let id = self.reviews.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        self.reviews.push(ReviewAssignment {
            id,
            reviewer,
            state: ReviewState::New,
            reason,
            created_by: actor.to_string(),
            created_at: Utc::now(),
            resolved_at: None,
        });
        self.recompute_state();
        Ok(id)
    }

    /// Record an accept/decline outcome on one assignment.
    ///
    /// A declined review does NOT decline the request; whether to do so is a
    /// separate policy decision. When no assignment remains `new`, the
    /// request returns to `new` and awaits an explicit final accept/decline.
    pub fn resolve_review(
        &mut self,
        review_id: u64,
        outcome: ReviewOutcome,
        reason: Option<String>,
    ) -> Result<(), PackflowError> {
        if self.state.is_terminal() {
            return Err(PackflowError::StateViolation(format!(
                "Cannot resolve review on request {} in state {}",
                self.number, self.state
            )));
        }

        let review = self
            .reviews
            .iter_mut()
            .find(|r| r.id == review_id)
            .ok_or_else(|| {
                PackflowError::NotFound(format!(
                    "Review {} on request {}",
                    review_id, self.number
                ))
            })?;

        if review.state != ReviewState::New {
            return Err(PackflowError::StateViolation(format!(
                "Review {} on request {} already resolved",
                review_id, self.number
            )));
        }

        review.state = match outcome {
            ReviewOutcome::Accepted => ReviewState::Accepted,
            ReviewOutcome::Declined => ReviewState::Declined,
        };
        review.reason = reason;
        review.resolved_at = Some(Utc::now());

        self.recompute_state();
        Ok(())
    }

    /// Final accept. Legal from `new`; from `review` only with an explicit
    /// override, surfaced to the caller as a confirmation requirement.
    pub fn accept(&mut self, actor: &str, force: bool) -> Result<(), PackflowError> {
        match self.state {
            RequestState::New => {}
            RequestState::Review => {
                if !force {
                    return Err(PackflowError::StateViolation(format!(
                        "Request {} still has open reviews; accepting requires an explicit override",
                        self.number
                    )));
                }
            }
            other => {
                return Err(PackflowError::StateViolation(format!(
                    "Cannot accept request {} in state {}",
                    self.number, other
                )));
            }
        }

        tracing::info!("Request {} accepted by {}", self.number, actor);
        self.state = RequestState::Accepted;
        Ok(())
    }

    /// Decline from any non-terminal state. Open review assignments stay
    /// `new` as history; they are not auto-resolved.
    pub fn decline(&mut self, reason: &str, actor: &str) -> Result<(), PackflowError> {
        if self.state.is_terminal() {
            return Err(PackflowError::StateViolation(format!(
                "Cannot decline request {} in state {}",
                self.number, self.state
            )));
        }

        tracing::info!("Request {} declined by {}: {}", self.number, actor, reason);
        self.state = RequestState::Declined;
        Ok(())
    }

    pub fn revoke(&mut self, reason: &str, actor: &str) -> Result<(), PackflowError> {
        if self.state.is_terminal() {
            return Err(PackflowError::StateViolation(format!(
                "Cannot revoke request {} in state {}",
                self.number, self.state
            )));
        }

        tracing::info!("Request {} revoked by {}: {}", self.number, actor, reason);
        self.state = RequestState::Revoked;
        Ok(())
    }

    /// Legal only from `declined`.
    pub fn reopen(&mut self, actor: &str) -> Result<(), PackflowError> {
        if self.state != RequestState::Declined {
            return Err(PackflowError::StateViolation(format!(
                "Cannot reopen request {} in state {}",
                self.number, self.state
            )));
        }

        tracing::info!("Request {} reopened by {}", self.number, actor);
        self.state = RequestState::New;
        self.recompute_state();
        Ok(())
    }

    /// Replace this request with a newer one targeting the same destination.
    pub fn supersede(&mut self, by_number: u64) -> Result<(), PackflowError> {
        if self.state.is_terminal() {
            return Err(PackflowError::StateViolation(format!(
                "Cannot supersede request {} in state {}",
                self.number, self.state
            )));
        }

        self.state = RequestState::Superseded;
        self.superseded_by = Some(by_number);
        for review in &mut self.reviews {
            if review.state == ReviewState::New {
                review.state = ReviewState::Superseded;
                review.resolved_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    /// Side-effect transition: the target of a by-project/by-package review
    /// ceased to exist. Affected open reviews become `obsoleted` (not
    /// declined) and the request state is recomputed. Returns the number of
    /// reviews obsoleted.
    pub fn obsolete_reviews_for(&mut self, project: &str, package: Option<&str>) -> usize {
        let mut obsoleted = 0;
        for review in &mut self.reviews {
            if review.state == ReviewState::New && review.reviewer.targets(project, package) {
                review.state = ReviewState::Obsoleted;
                review.resolved_at = Some(Utc::now());
                obsoleted += 1;
            }
        }
        if obsoleted > 0 {
            self.recompute_state();
        }
        obsoleted
    }

    /// Derive the request state from the current assignment states.
    ///
    /// Pure and order-independent: `review` iff at least one assignment is
    /// `new`, otherwise `new`. Terminal states are never touched. A request
    /// with zero assignments is `new`, never `review`.
    pub fn recompute_state(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.state = if self.has_open_reviews() {
            RequestState::Review
        } else {
            RequestState::New
        };
    }
}
