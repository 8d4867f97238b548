#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use prediction_service::config::{CorsConfig, ModelConfig, PredictionConfig};
use prediction_service::models::FEATURE_COUNT;
use prediction_service::services::{LinearRegressor, ModelState};
use prediction_service::startup::{build_router, AppState, Application};
use service_core::config::Config as CoreConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;

pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

/// The artifact shipped with the service.
pub fn bundled_model_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("model")
        .join("realstate_prices_mlp_model.json")
}

pub fn missing_model_path() -> PathBuf {
    std::env::temp_dir().join(format!("missing-model-{}.json", uuid::Uuid::new_v4()))
}

pub fn test_config(model_path: PathBuf, fail_fast: bool) -> PredictionConfig {
    PredictionConfig {
        // Use random port for testing (port 0)
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..CoreConfig::default()
        },
        model: ModelConfig {
            path: model_path,
            fail_fast,
        },
        cors: CorsConfig::default(),
    }
}

impl TestApp {
    /// Spawn the service with the bundled model.
    pub async fn spawn() -> Self {
        Self::spawn_with(test_config(bundled_model_path(), false)).await
    }

    /// Spawn the service pointing at an artifact that does not exist.
    pub async fn spawn_degraded() -> Self {
        Self::spawn_with(test_config(missing_model_path(), false)).await
    }

    pub async fn spawn_with(config: PredictionConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }

    pub async fn post_predict(&self, body: String) -> reqwest::Response {
        reqwest::Client::new()
            .post(format!("{}/api/predict", self.address))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Linear stub: `price = 100 * floors + 2 * area + 7`.
pub fn stub_model() -> ModelState {
    let mut coef = [0.0; FEATURE_COUNT];
    coef[0] = 100.0;
    coef[1] = 2.0;
    let model = LinearRegressor::new(coef, 7.0, None).expect("valid stub model");
    ModelState::from_predictor(Arc::new(model), Path::new("stub.json"))
}

pub fn failed_model() -> ModelState {
    ModelState::Failed {
        reason: "artifact missing".to_string(),
    }
}

pub fn router(model: ModelState) -> Router {
    build_router(AppState::new(model), &CorsConfig::default().allowed_origins)
}

/// Drive one request through the router in-process.
pub async fn send(
    router: Router,
    request: Request<Body>,
) -> (StatusCode, HeaderMap, serde_json::Value) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, headers, body)
}

pub fn predict_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
