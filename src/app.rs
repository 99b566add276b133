//! Application wiring: shared state and the HTTP router.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::automation::{AutomationEngine, InMemorySubscriptions, RunLedger};
use crate::backend::InMemoryBackend;
use crate::checks::CheckStore;
use crate::config::{AppConfig, WorkflowsConfig};
use crate::error::PackflowError;
use crate::requests::RequestStore;
use crate::scm::{HttpStatusReporter, StatusReporter};
use crate::staging::{BatchAggregator, StagingStore};
use crate::webhooks;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub requests: Arc<RequestStore>,
    pub staging: Arc<StagingStore>,
    pub checks: Arc<CheckStore>,
    pub runs: Arc<RunLedger>,
    pub backend: Arc<InMemoryBackend>,
    pub subscriptions: Arc<InMemorySubscriptions>,
    pub engine: Arc<AutomationEngine>,
}

impl AppState {
    pub fn new(config: AppConfig, workflows: WorkflowsConfig) -> Result<Self, PackflowError> {
        let reporter: Arc<dyn StatusReporter> = Arc::new(HttpStatusReporter::new(
            &config.scm_token,
            config.scm_timeout_secs,
        )?);
        Self::with_reporter(config, workflows, reporter)
    }

    /// Wiring seam used by tests to swap the outbound reporter.
    pub fn with_reporter(
        config: AppConfig,
        workflows: WorkflowsConfig,
        reporter: Arc<dyn StatusReporter>,
    ) -> Result<Self, PackflowError> {
        let requests = Arc::new(RequestStore::new());
        let checks = Arc::new(CheckStore::new());
        let runs = Arc::new(RunLedger::new());
        let backend = Arc::new(InMemoryBackend::new());
        let subscriptions = Arc::new(InMemorySubscriptions::new());

        let engine = Arc::new(AutomationEngine::new(
            &config.workflow_actor,
            workflows.steps,
            backend.clone(),
            subscriptions.clone(),
            reporter,
            requests.clone(),
            runs.clone(),
        ));

        Ok(Self {
            config,
            requests,
            staging: Arc::new(StagingStore::new()),
            checks,
            runs,
            backend,
            subscriptions,
            engine,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_endpoint))
        .route("/webhooks/github", post(webhooks::github::handle_webhook))
        .route("/webhooks/gitlab", post(webhooks::gitlab::handle_webhook))
        .route("/checks/report", post(webhooks::checks::handle_check_report))
        .route("/staging/:name", get(staging_status))
        .route("/runs/:id", get(run_status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "packflow",
        "timestamp": chrono::Utc::now()
    }))
}

async fn status_endpoint(State(state): State<AppState>) -> Json<serde_json::Value> {
    let active = state.requests.list_active().await.len();
    let batches = state.staging.list().await.len();
    let runs = state.runs.list().await.len();

    Json(serde_json::json!({
        "status": "healthy",
        "service": "packflow",
        "timestamp": chrono::Utc::now(),
        "active_requests": active,
        "staging_batches": batches,
        "automation_runs": runs,
    }))
}

async fn staging_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(batch) = state.staging.get(&name).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("staging batch {} not found", name)})),
        );
    };

    let aggregator = BatchAggregator::new(
        state.backend.as_ref(),
        state.checks.as_ref(),
        state.requests.as_ref(),
    );

    let overall = aggregator.overall_state(&batch).await;
    let missing = aggregator.missing_checks(&batch).await;
    let checks = aggregator.checks(&batch).await;
    let reviews = aggregator.missing_reviews(&batch).await;

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "name": batch.name,
            "overall_state": overall,
            "staged_requests": batch.staged_requests,
            "missing_checks": missing,
            "checks": checks,
            "missing_reviews": reviews,
        })),
    )
}

async fn run_status(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.runs.get(id).await {
        Some(run) => (StatusCode::OK, Json(serde_json::json!(run))),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("automation run {} not found", id)})),
        ),
    }
}
