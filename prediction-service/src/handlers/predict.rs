use crate::models::{CoercionError, FeatureVector};
use crate::services::{record_prediction, InferenceError, ModelState};
use crate::startup::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::time::Instant;
use thiserror::Error;

/// Every failure is reported to the caller the same way: HTTP 500 with an
/// `error` message. The variants only exist for logs and metrics.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Did not attempt to load JSON data because the request Content-Type was not 'application/json'")]
    UnsupportedMediaType,

    #[error("Failed to decode JSON object: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error(transparent)]
    InvalidInput(#[from] CoercionError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub predicted_price: f64,
}

/// `POST /api/predict`: price one property.
///
/// The body is read raw so that a wrong content type or malformed JSON is
/// reported through the same 500 path as every other failure instead of
/// axum's extractor rejections.
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictionResponse>, PredictError> {
    let start = Instant::now();
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    match run_prediction(&state.model, content_type, &body) {
        Ok(predicted_price) => {
            record_prediction("success", start.elapsed());
            tracing::debug!(predicted_price, "Prediction served");
            Ok(Json(PredictionResponse { predicted_price }))
        }
        Err(e) => {
            record_prediction("error", start.elapsed());
            tracing::warn!(error = %e, "Error during prediction");
            Err(e)
        }
    }
}

/// `application/json` or any `application/*+json`, parameters allowed.
fn is_json_content_type(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn run_prediction(
    model: &ModelState,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<f64, PredictError> {
    let predictor = model.predictor().ok_or(PredictError::ModelNotLoaded)?;
    if !is_json_content_type(content_type) {
        return Err(PredictError::UnsupportedMediaType);
    }
    let payload: serde_json::Value = serde_json::from_slice(body)?;
    let features = FeatureVector::from_json(&payload)?;
    Ok(predictor.predict(&features)?)
}
