//! Check result ingestion.
//!
//! Build systems post named pass/fail/pending signals against a publish
//! report uuid. Writes are keyed by `(report uuid, name)`; results for a
//! superseded uuid stay recorded but fall out of the aggregation.

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::info;

use crate::app::AppState;
use crate::checks::CheckState;

#[derive(Debug, Deserialize)]
pub struct CheckReportRequest {
    pub project: String,
    pub repository: String,
    pub architecture: Option<String>,
    pub report_uuid: String,
    pub name: String,
    pub state: CheckState,
    pub details: Option<String>,
}

pub async fn handle_check_report(
    State(state): State<AppState>,
    Json(request): Json<CheckReportRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if request.report_uuid.trim().is_empty() || request.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "report_uuid and name are required"})),
        );
    }

    let result = state
        .checks
        .upsert(
            &request.report_uuid,
            &request.name,
            request.state,
            request.details.clone(),
        )
        .await;

    info!(
        "Check {} recorded for {}/{}/{} (report {})",
        request.name,
        request.project,
        request.repository,
        request.architecture.as_deref().unwrap_or("all"),
        request.report_uuid
    );

    (StatusCode::OK, Json(serde_json::json!({ "result": result })))
}
