use axum::{extract::State, http::HeaderMap, http::StatusCode, response::Json};
use serde_json::Value;
use tracing::{info, warn};

use crate::app::AppState;
use crate::scm::Envelope;

pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let event_name = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");

    info!("Received GitHub webhook: {}", event_name);

    let envelope = match Envelope::from_github(
        event_name,
        &payload,
        &state.config.github_api_endpoint,
    ) {
        Ok(Some(envelope)) => envelope,
        Ok(None) => {
            return (
                StatusCode::OK,
                Json(serde_json::json!({"status": "ignored"})),
            );
        }
        Err(e) => {
            warn!("Malformed GitHub payload: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            );
        }
    };

    super::run_engine(&state, envelope).await
}
