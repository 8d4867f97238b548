//! In-memory regressors that turn a [`FeatureVector`] into a price.

use crate::models::{FeatureVector, FEATURE_COUNT};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InferenceError {
    #[error("Model produced a non-finite prediction: {0}")]
    NonFinite(f64),
}

/// A loaded model. Implementations are immutable after construction and are
/// shared across request handlers without locking.
pub trait PricePredictor: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError>;

    /// Short model family name reported by the readiness probe.
    fn kind(&self) -> &'static str;
}

/// Hidden-layer activation. The output layer is always the identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Tanh,
    Logistic,
    Identity,
}

impl Activation {
    fn apply(self, values: &mut [f64]) {
        match self {
            Activation::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Activation::Tanh => values.iter_mut().for_each(|v| *v = v.tanh()),
            Activation::Logistic => values
                .iter_mut()
                .for_each(|v| *v = 1.0 / (1.0 + (-*v).exp())),
            Activation::Identity => {}
        }
    }
}

/// Per-feature standardisation applied before the first layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    mean: [f64; FEATURE_COUNT],
    scale: [f64; FEATURE_COUNT],
}

impl Scaler {
    /// `scale` entries must be finite and non-zero.
    pub fn new(mean: [f64; FEATURE_COUNT], scale: [f64; FEATURE_COUNT]) -> Option<Self> {
        let valid = mean.iter().all(|m| m.is_finite())
            && scale.iter().all(|s| s.is_finite() && *s != 0.0);
        valid.then_some(Self { mean, scale })
    }

    fn transform(&self, row: &mut [f64; FEATURE_COUNT]) {
        for ((x, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *x = (*x - mean) / scale;
        }
    }
}

/// A fully connected layer with weights stored `[input][output]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl DenseLayer {
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Result<Self, String> {
        if weights.is_empty() {
            return Err("layer has no inputs".to_string());
        }
        if let Some(row) = weights.iter().find(|row| row.len() != bias.len()) {
            return Err(format!(
                "weight row has {} outputs but bias has {}",
                row.len(),
                bias.len()
            ));
        }
        let finite = weights.iter().flatten().chain(&bias).all(|v| v.is_finite());
        if !finite {
            return Err("layer contains non-finite parameters".to_string());
        }
        Ok(Self { weights, bias })
    }

    pub fn inputs(&self) -> usize {
        self.weights.len()
    }

    pub fn outputs(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut output = self.bias.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (acc, w) in output.iter_mut().zip(row) {
                *acc += x * w;
            }
        }
        output
    }
}

/// Multilayer perceptron regressor with a single output unit.
#[derive(Debug, Clone, PartialEq)]
pub struct MlpRegressor {
    layers: Vec<DenseLayer>,
    activation: Activation,
    scaler: Option<Scaler>,
}

impl MlpRegressor {
    /// Chain `layers`, checking that widths line up from [`FEATURE_COUNT`]
    /// inputs down to one output.
    pub fn new(
        layers: Vec<DenseLayer>,
        activation: Activation,
        scaler: Option<Scaler>,
    ) -> Result<Self, String> {
        let mut width = FEATURE_COUNT;
        for (i, layer) in layers.iter().enumerate() {
            if layer.inputs() != width {
                return Err(format!(
                    "layer {} expects {} inputs but receives {}",
                    i,
                    layer.inputs(),
                    width
                ));
            }
            width = layer.outputs();
        }

        if layers.is_empty() {
            return Err("network has no layers".to_string());
        }
        if width != 1 {
            return Err(format!("network has {} outputs, expected 1", width));
        }

        Ok(Self {
            layers,
            activation,
            scaler,
        })
    }
}

impl PricePredictor for MlpRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let mut row = features.to_array();
        if let Some(scaler) = &self.scaler {
            scaler.transform(&mut row);
        }

        let last = self.layers.len() - 1;
        let mut activations = row.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            activations = layer.forward(&activations);
            if i < last {
                self.activation.apply(&mut activations);
            }
        }

        finite(activations[0])
    }

    fn kind(&self) -> &'static str {
        "mlp"
    }
}

/// Ordinary linear regressor: `coef · x + intercept`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegressor {
    coef: [f64; FEATURE_COUNT],
    intercept: f64,
    scaler: Option<Scaler>,
}

impl LinearRegressor {
    pub fn new(
        coef: [f64; FEATURE_COUNT],
        intercept: f64,
        scaler: Option<Scaler>,
    ) -> Result<Self, String> {
        if !coef.iter().chain([&intercept]).all(|v| v.is_finite()) {
            return Err("linear model contains non-finite parameters".to_string());
        }
        Ok(Self {
            coef,
            intercept,
            scaler,
        })
    }
}

impl PricePredictor for LinearRegressor {
    fn predict(&self, features: &FeatureVector) -> Result<f64, InferenceError> {
        let mut row = features.to_array();
        if let Some(scaler) = &self.scaler {
            scaler.transform(&mut row);
        }

        let sum: f64 = row.iter().zip(&self.coef).map(|(x, c)| x * c).sum();
        finite(sum + self.intercept)
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

fn finite(prediction: f64) -> Result<f64, InferenceError> {
    if prediction.is_finite() {
        Ok(prediction)
    } else {
        Err(InferenceError::NonFinite(prediction))
    }
}
