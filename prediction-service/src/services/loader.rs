//! Model artifact loading and the process-wide model state.
//!
//! The artifact is a JSON document:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "kind": "mlp",
//!   "activation": "relu",
//!   "coefs": [[[...]]],
//!   "intercepts": [[...]],
//!   "scaler": { "mean": [...], "scale": [...] }
//! }
//! ```
//!
//! or `"kind": "linear"` with `coef` and `intercept`.

use super::predictor::{
    Activation, DenseLayer, LinearRegressor, MlpRegressor, PricePredictor, Scaler,
};
use crate::models::FEATURE_COUNT;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Unsupported model artifact version {0} (expected {ARTIFACT_FORMAT_VERSION})")]
    UnsupportedVersion(u32),

    #[error("Invalid model structure: {0}")]
    Shape(String),
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum ArtifactBody {
    Mlp {
        coefs: Vec<Vec<Vec<f64>>>,
        intercepts: Vec<Vec<f64>>,
        #[serde(default)]
        activation: Activation,
        #[serde(default)]
        scaler: Option<ArtifactScaler>,
    },
    Linear {
        coef: [f64; FEATURE_COUNT],
        intercept: f64,
        #[serde(default)]
        scaler: Option<ArtifactScaler>,
    },
}

#[derive(Deserialize)]
struct ArtifactScaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl ArtifactScaler {
    fn build(self) -> Result<Scaler, ModelError> {
        Scaler::new(self.mean, self.scale).ok_or_else(|| {
            ModelError::Shape("scaler entries must be finite with non-zero scale".to_string())
        })
    }
}

/// Decode an artifact held in memory.
pub fn parse_model(bytes: &[u8]) -> Result<Arc<dyn PricePredictor>, ModelError> {
    let raw: serde_json::Value = serde_json::from_slice(bytes)?;

    let header = ArtifactHeader::deserialize(&raw)?;
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(ModelError::UnsupportedVersion(header.format_version));
    }

    match ArtifactBody::deserialize(&raw)? {
        ArtifactBody::Mlp {
            coefs,
            intercepts,
            activation,
            scaler,
        } => {
            if coefs.len() != intercepts.len() {
                return Err(ModelError::Shape(format!(
                    "{} weight matrices but {} bias vectors",
                    coefs.len(),
                    intercepts.len()
                )));
            }
            let layers = coefs
                .into_iter()
                .zip(intercepts)
                .enumerate()
                .map(|(i, (weights, bias))| {
                    DenseLayer::new(weights, bias)
                        .map_err(|e| ModelError::Shape(format!("layer {}: {}", i, e)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let scaler = scaler.map(ArtifactScaler::build).transpose()?;
            let model = MlpRegressor::new(layers, activation, scaler).map_err(ModelError::Shape)?;
            Ok(Arc::new(model))
        }
        ArtifactBody::Linear {
            coef,
            intercept,
            scaler,
        } => {
            let scaler = scaler.map(ArtifactScaler::build).transpose()?;
            let model =
                LinearRegressor::new(coef, intercept, scaler).map_err(ModelError::Shape)?;
            Ok(Arc::new(model))
        }
    }
}

/// Read and decode the artifact at `path`.
pub fn load_model(path: &Path) -> Result<Arc<dyn PricePredictor>, ModelError> {
    let bytes = std::fs::read(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_model(&bytes)
}

/// A successfully loaded model and where it came from.
#[derive(Clone)]
pub struct LoadedModel {
    pub predictor: Arc<dyn PricePredictor>,
    pub path: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

/// Outcome of the one-time startup load. Never changes afterwards.
#[derive(Clone)]
pub enum ModelState {
    Loaded(LoadedModel),
    Failed { reason: String },
}

impl ModelState {
    /// Load the artifact, logging the outcome. Failures are kept as state,
    /// never returned.
    pub fn load(path: &Path) -> Self {
        tracing::info!(path = %path.display(), "Loading model");

        match load_model(path) {
            Ok(predictor) => {
                tracing::info!(
                    path = %path.display(),
                    kind = predictor.kind(),
                    "Model loaded successfully"
                );
                Self::from_predictor(predictor, path)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error loading model");
                ModelState::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn from_predictor(predictor: Arc<dyn PricePredictor>, path: &Path) -> Self {
        ModelState::Loaded(LoadedModel {
            predictor,
            path: path.to_path_buf(),
            loaded_at: Utc::now(),
        })
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Loaded(_))
    }

    pub fn predictor(&self) -> Option<&dyn PricePredictor> {
        match self {
            ModelState::Loaded(model) => Some(model.predictor.as_ref()),
            ModelState::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureVector;
    use serde_json::json;

    fn linear_artifact() -> serde_json::Value {
        json!({
            "format_version": 1,
            "kind": "linear",
            "coef": [1.0, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "intercept": 2.0
        })
    }

    fn parse(value: serde_json::Value) -> Result<Arc<dyn PricePredictor>, ModelError> {
        parse_model(value.to_string().as_bytes())
    }

    #[test]
    fn test_parse_linear_artifact() {
        let model = parse(linear_artifact()).expect("linear artifact should load");
        assert_eq!(model.kind(), "linear");
        // 1*1 + 0.1*10 + 2
        assert_eq!(model.predict(&FeatureVector::default()), Ok(4.0));
    }

    #[test]
    fn test_parse_mlp_artifact() {
        let mut hidden = vec![vec![0.0, 0.0]; FEATURE_COUNT];
        hidden[0] = vec![1.0, 2.0];
        let model = parse(json!({
            "format_version": 1,
            "kind": "mlp",
            "activation": "identity",
            "coefs": [hidden, [[1.0], [1.0]]],
            "intercepts": [[0.0, 0.0], [0.5]]
        }))
        .expect("mlp artifact should load");

        assert_eq!(model.kind(), "mlp");
        // floors=1 -> hidden [1, 2] -> 3 + 0.5
        assert_eq!(model.predict(&FeatureVector::default()), Ok(3.5));
    }

    #[test]
    fn test_unsupported_version() {
        let mut artifact = linear_artifact();
        artifact["format_version"] = json!(2);
        assert!(matches!(
            parse(artifact),
            Err(ModelError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_garbage_is_a_format_error() {
        assert!(matches!(
            parse_model(b"\x80\x04\x95pickle"),
            Err(ModelError::Format(_))
        ));
    }

    #[test]
    fn test_unknown_kind_is_a_format_error() {
        let mut artifact = linear_artifact();
        artifact["kind"] = json!("random_forest");
        assert!(matches!(parse(artifact), Err(ModelError::Format(_))));
    }

    #[test]
    fn test_wrong_coefficient_count_is_rejected() {
        let mut artifact = linear_artifact();
        artifact["coef"] = json!([1.0, 2.0]);
        assert!(parse(artifact).is_err());
    }

    #[test]
    fn test_mismatched_layer_count_is_a_shape_error() {
        let artifact = json!({
            "format_version": 1,
            "kind": "mlp",
            "coefs": [vec![vec![1.0]; FEATURE_COUNT]],
            "intercepts": []
        });
        assert!(matches!(parse(artifact), Err(ModelError::Shape(_))));
    }

    #[test]
    fn test_zero_scale_is_a_shape_error() {
        let zeros = [0.0; FEATURE_COUNT];
        let mut artifact = linear_artifact();
        artifact["scaler"] = json!({ "mean": zeros, "scale": zeros });
        assert!(matches!(parse(artifact), Err(ModelError::Shape(_))));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join("prediction-service-missing-model.json");
        assert!(matches!(load_model(&path), Err(ModelError::Io { .. })));
    }

    #[test]
    fn test_state_records_failure_reason() {
        let path = std::env::temp_dir().join("prediction-service-missing-model.json");
        let state = ModelState::load(&path);
        assert!(!state.is_loaded());
        assert!(state.predictor().is_none());
        match state {
            ModelState::Failed { reason } => assert!(reason.contains("Failed to read")),
            ModelState::Loaded(_) => panic!("missing artifact must not load"),
        }
    }

    #[test]
    fn test_bundled_artifact_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("model")
            .join("realstate_prices_mlp_model.json");
        let state = ModelState::load(&path);
        let predictor = state.predictor().expect("bundled artifact should load");
        assert_eq!(predictor.kind(), "mlp");
        assert!(predictor
            .predict(&FeatureVector::default())
            .unwrap()
            .is_finite());
    }
}
