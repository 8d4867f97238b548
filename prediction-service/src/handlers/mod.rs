//! HTTP handlers for prediction-service.

pub mod health;
pub mod index;
pub mod metrics;
pub mod predict;

pub use health::{health_check, readiness_check};
pub use index::{index, not_found};
pub use self::metrics::metrics_endpoint;
pub use predict::{predict, PredictError, PredictionResponse};
