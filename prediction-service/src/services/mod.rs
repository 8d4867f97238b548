pub mod loader;
pub mod metrics;
pub mod predictor;

pub use loader::{load_model, parse_model, LoadedModel, ModelError, ModelState};
pub use self::metrics::{get_metrics, init_metrics, record_prediction};
pub use predictor::{
    Activation, DenseLayer, InferenceError, LinearRegressor, MlpRegressor, PricePredictor, Scaler,
};
