use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use service_core::error::AppError;

pub const GREETING: &str = "NepalEstate backend is running!";
pub const MODEL_LOADED: &str = "Model loaded successfully";
pub const MODEL_FAILED: &str = "Model failed to load";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
    pub model_status: &'static str,
}

/// Root status page: 200 when the model is serving, 500 in degraded mode.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let (status, model_status) = if state.model.is_loaded() {
        (StatusCode::OK, MODEL_LOADED)
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, MODEL_FAILED)
    };

    (
        status,
        Json(StatusResponse {
            message: GREETING,
            model_status,
        }),
    )
}

pub async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Resource not found"))
}
