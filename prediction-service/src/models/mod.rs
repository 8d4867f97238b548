pub mod features;

pub use features::{CoercionError, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
