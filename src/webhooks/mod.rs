pub mod checks;
pub mod github;
pub mod gitlab;

use axum::{http::StatusCode, response::Json};
use serde_json::Value;
use tracing::warn;

use crate::app::AppState;
use crate::scm::Envelope;

/// Hand a normalized envelope to the automation engine and mirror the run
/// outcome in the HTTP response.
pub(crate) async fn run_engine(
    state: &AppState,
    envelope: Envelope,
) -> (StatusCode, Json<Value>) {
    match state.engine.process(envelope).await {
        Ok(run) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "run_id": run.id,
                "status": run.status,
                "steps": run.steps,
                "response": run.response_body,
            })),
        ),
        Err(e) => {
            warn!("Rejected webhook delivery: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "reason": e.reason_code(),
                })),
            )
        }
    }
}
