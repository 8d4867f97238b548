use crate::models::FEATURE_NAMES;
use crate::services::ModelState;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// Liveness probe. The process is alive even when the model is not.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "prediction-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe: only ready once a model is serving.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.model.as_ref() {
        ModelState::Loaded(model) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "model": {
                    "kind": model.predictor.kind(),
                    "path": model.path.display().to_string(),
                    "loaded_at": model.loaded_at,
                    "features": FEATURE_NAMES,
                }
            })),
        ),
        ModelState::Failed { reason } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "reason": reason,
            })),
        ),
    }
}
