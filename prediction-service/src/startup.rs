//! Application startup and lifecycle management.
//!
//! The model is loaded exactly once while building the [`Application`] and is
//! handed to every request through [`AppState`].

use crate::config::PredictionConfig;
use crate::handlers::{
    health_check, index, metrics_endpoint, not_found, predict, readiness_check,
};
use crate::services::ModelState;
use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, RequestId,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state. Read-only for the lifetime of the process.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelState>,
}

impl AppState {
    pub fn new(model: ModelState) -> Self {
        Self {
            model: Arc::new(model),
        }
    }
}

/// CORS policy for `/api/*`. Origins outside the list get no
/// `access-control-allow-origin` header and are refused by browsers.
/// Preflights get back whatever request headers they asked for.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = allowed_origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                    None
                }
            })
            .collect::<Vec<HeaderValue>>();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/api/predict", post(predict))
        .layer(cors_layer(allowed_origins));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .merge(api_routes)
        .fallback(not_found)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Load the model and bind the listener.
    ///
    /// A model that fails to load leaves the service in degraded mode unless
    /// `model.fail_fast` is set, in which case startup is aborted.
    pub async fn build(config: PredictionConfig) -> Result<Self, AppError> {
        let model_path = config.model_path();
        let model = ModelState::load(&model_path);

        if let ModelState::Failed { reason } = &model {
            if config.model.fail_fast {
                tracing::error!("Failed to load model. Exiting.");
                return Err(AppError::InternalError(anyhow::anyhow!(
                    "model {} failed to load: {}",
                    model_path.display(),
                    reason
                )));
            }
            tracing::warn!("Serving in degraded mode: predictions will fail until restart");
        }

        Self::build_with_model(config, model).await
    }

    /// Bind the listener around an already-resolved model state.
    pub async fn build_with_model(
        config: PredictionConfig,
        model: ModelState,
    ) -> Result<Self, AppError> {
        let state = AppState::new(model);
        let router = build_router(state.clone(), &config.cors.allowed_origins);

        // Port 0 picks a random port, used by tests.
        let address = format!("{}:{}", config.common.host, config.common.port);
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", address, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            "Prediction service listening on {}:{}",
            config.common.host,
            port
        );

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn model_loaded(&self) -> bool {
        self.state.model.is_loaded()
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
