//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use packflow::automation::{AutomationEngine, InMemorySubscriptions, RunLedger};
use packflow::backend::InMemoryBackend;
use packflow::config::workflows::{BranchStepConfig, StepConfig};
use packflow::requests::RequestStore;
use packflow::scm::{
    CommitState, Envelope, EventKind, PrAction, ReporterError, ScmProvider, StatusReporter,
};

/// Reporter test double: records every posted status, optionally failing
/// every call with an unauthorized or transport error.
pub struct RecordingReporter {
    pub calls: Mutex<Vec<(CommitState, String)>>,
    unauthorized: AtomicBool,
    transport_failure: AtomicBool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            unauthorized: AtomicBool::new(false),
            transport_failure: AtomicBool::new(false),
        }
    }

    pub fn fail_unauthorized(&self) {
        self.unauthorized.store(true, Ordering::SeqCst);
    }

    pub fn fail_transport(&self) {
        self.transport_failure.store(true, Ordering::SeqCst);
    }

    pub async fn contexts(&self) -> Vec<String> {
        let calls = self.calls.lock().await;
        calls.iter().map(|(_, context)| context.clone()).collect()
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn report(
        &self,
        _envelope: &Envelope,
        state: CommitState,
        context: &str,
        _target_url: Option<&str>,
    ) -> Result<(), ReporterError> {
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(ReporterError::Unauthorized("401 Unauthorized".to_string()));
        }
        if self.transport_failure.load(Ordering::SeqCst) {
            return Err(ReporterError::Transport("connection refused".to_string()));
        }
        let mut calls = self.calls.lock().await;
        calls.push((state, context.to_string()));
        Ok(())
    }
}

/// Everything an automation test needs to inspect after a run.
pub struct Fixture {
    pub backend: Arc<InMemoryBackend>,
    pub subscriptions: Arc<InMemorySubscriptions>,
    pub reporter: Arc<RecordingReporter>,
    pub requests: Arc<RequestStore>,
    pub ledger: Arc<RunLedger>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
            subscriptions: Arc::new(InMemorySubscriptions::new()),
            reporter: Arc::new(RecordingReporter::new()),
            requests: Arc::new(RequestStore::new()),
            ledger: Arc::new(RunLedger::new()),
        }
    }

    pub fn engine(&self, steps: Vec<StepConfig>) -> AutomationEngine {
        AutomationEngine::new(
            "packflow-bot",
            steps,
            self.backend.clone(),
            self.subscriptions.clone(),
            self.reporter.clone(),
            self.requests.clone(),
            self.ledger.clone(),
        )
    }
}

pub fn branch_step() -> StepConfig {
    StepConfig::BranchPackage(BranchStepConfig {
        source_project: "devel:tools".to_string(),
        source_package: "ctris".to_string(),
        target_project: "home:bot:ci".to_string(),
    })
}

pub fn pr_envelope(action: PrAction, pr_number: u64) -> Envelope {
    Envelope {
        scm: ScmProvider::Github,
        event: EventKind::PullRequest,
        action: Some(action),
        merged: action == PrAction::Closed,
        commit_sha: "deadbeefcafe0123456789".to_string(),
        source_repository_full_name: "forker/hello".to_string(),
        target_repository_full_name: "octo/hello".to_string(),
        source_branch: "feature".to_string(),
        target_branch: "main".to_string(),
        pr_number: Some(pr_number),
        tag_name: None,
        api_endpoint: "https://api.github.com".to_string(),
    }
}

pub fn push_envelope(commit_sha: &str) -> Envelope {
    Envelope {
        scm: ScmProvider::Github,
        event: EventKind::Push,
        action: None,
        merged: false,
        commit_sha: commit_sha.to_string(),
        source_repository_full_name: "octo/hello".to_string(),
        target_repository_full_name: "octo/hello".to_string(),
        source_branch: "main".to_string(),
        target_branch: "main".to_string(),
        pr_number: None,
        tag_name: None,
        api_endpoint: "https://api.github.com".to_string(),
    }
}

pub fn tag_envelope(tag_name: &str) -> Envelope {
    Envelope {
        scm: ScmProvider::Github,
        event: EventKind::TagPush,
        action: None,
        merged: false,
        commit_sha: "deadbeefcafe0123456789".to_string(),
        source_repository_full_name: "octo/hello".to_string(),
        target_repository_full_name: "octo/hello".to_string(),
        source_branch: String::new(),
        target_branch: String::new(),
        pr_number: None,
        tag_name: Some(tag_name.to_string()),
        api_endpoint: "https://api.github.com".to_string(),
    }
}
