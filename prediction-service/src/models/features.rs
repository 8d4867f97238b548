//! Property feature vector and the coercion rules that build it from a JSON
//! request body.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 9;

/// Input names in the order the model consumes them.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "floors",
    "area",
    "road_width",
    "city_bhaktapur",
    "city_kathmandu",
    "city_lalitpur",
    "road_type_blacktopped",
    "road_type_gravelled",
    "road_type_soil_stabilized",
];

const DEFAULT_FLOORS: f64 = 1.0;
const DEFAULT_AREA: f64 = 10.0;
const DEFAULT_ROAD_WIDTH: f64 = 10.0;
const DEFAULT_FLAG: i64 = 0;

#[derive(Debug, Error, PartialEq)]
pub enum CoercionError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("could not convert {field} to float: {value}")]
    NotAFloat { field: &'static str, value: String },

    #[error("invalid literal for integer field {field}: {value}")]
    NotAnInteger { field: &'static str, value: String },

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: &'static str, value: String },
}

/// One property, encoded the way the regressor was trained.
///
/// City and road-type flags are one-hot columns. They are not checked for
/// mutual exclusivity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub floors: f64,
    pub area: f64,
    pub road_width: f64,
    pub city_bhaktapur: i64,
    pub city_kathmandu: i64,
    pub city_lalitpur: i64,
    pub road_type_blacktopped: i64,
    pub road_type_gravelled: i64,
    pub road_type_soil_stabilized: i64,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            floors: DEFAULT_FLOORS,
            area: DEFAULT_AREA,
            road_width: DEFAULT_ROAD_WIDTH,
            city_bhaktapur: DEFAULT_FLAG,
            city_kathmandu: DEFAULT_FLAG,
            city_lalitpur: DEFAULT_FLAG,
            road_type_blacktopped: DEFAULT_FLAG,
            road_type_gravelled: DEFAULT_FLAG,
            road_type_soil_stabilized: DEFAULT_FLAG,
        }
    }
}

impl FeatureVector {
    /// Build a feature vector from a decoded request body.
    ///
    /// Missing fields take their defaults and unknown keys are ignored.
    pub fn from_json(body: &Value) -> Result<Self, CoercionError> {
        let fields = body.as_object().ok_or(CoercionError::NotAnObject)?;

        Ok(Self {
            floors: float_field(fields, "floors", DEFAULT_FLOORS)?,
            area: float_field(fields, "area", DEFAULT_AREA)?,
            road_width: float_field(fields, "road_width", DEFAULT_ROAD_WIDTH)?,
            city_bhaktapur: int_field(fields, "city_bhaktapur", DEFAULT_FLAG)?,
            city_kathmandu: int_field(fields, "city_kathmandu", DEFAULT_FLAG)?,
            city_lalitpur: int_field(fields, "city_lalitpur", DEFAULT_FLAG)?,
            road_type_blacktopped: int_field(fields, "road_type_blacktopped", DEFAULT_FLAG)?,
            road_type_gravelled: int_field(fields, "road_type_gravelled", DEFAULT_FLAG)?,
            road_type_soil_stabilized: int_field(
                fields,
                "road_type_soil_stabilized",
                DEFAULT_FLAG,
            )?,
        })
    }

    /// The model input row, in [`FEATURE_NAMES`] order.
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.floors,
            self.area,
            self.road_width,
            self.city_bhaktapur as f64,
            self.city_kathmandu as f64,
            self.city_lalitpur as f64,
            self.road_type_blacktopped as f64,
            self.road_type_gravelled as f64,
            self.road_type_soil_stabilized as f64,
        ]
    }
}

fn float_field(
    fields: &Map<String, Value>,
    field: &'static str,
    default: f64,
) -> Result<f64, CoercionError> {
    let value = match fields.get(field) {
        None => return Ok(default),
        Some(value) => value,
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
    .ok_or_else(|| CoercionError::NotAFloat {
        field,
        value: value.to_string(),
    })?;

    if !number.is_finite() {
        return Err(CoercionError::NonFinite {
            field,
            value: value.to_string(),
        });
    }

    Ok(number)
}

fn int_field(
    fields: &Map<String, Value>,
    field: &'static str,
    default: i64,
) -> Result<i64, CoercionError> {
    let value = match fields.get(field) {
        None => return Ok(default),
        Some(value) => value,
    };

    let not_an_integer = || CoercionError::NotAnInteger {
        field,
        value: value.to_string(),
    };

    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i),
            // Floats truncate toward zero. Integers beyond i64 do not fit.
            None => n
                .as_f64()
                .filter(|_| n.is_f64())
                .map(f64::trunc)
                .filter(|f| *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
                .ok_or_else(not_an_integer),
        },
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_an_integer()),
        Value::Null | Value::Array(_) | Value::Object(_) => Err(not_an_integer()),
    }
}
