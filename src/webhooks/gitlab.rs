use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::Value;
use tracing::{info, warn};

use crate::app::AppState;
use crate::scm::Envelope;

pub async fn handle_webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let kind = payload
        .get("object_kind")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");

    info!("Received GitLab webhook: {}", kind);

    let envelope = match Envelope::from_gitlab(&payload, &state.config.gitlab_api_endpoint) {
        Ok(Some(envelope)) => envelope,
        Ok(None) => {
            return (
                StatusCode::OK,
                Json(serde_json::json!({"status": "ignored"})),
            );
        }
        Err(e) => {
            warn!("Malformed GitLab payload: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            );
        }
    };

    super::run_engine(&state, envelope).await
}
