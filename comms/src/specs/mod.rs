//! Typed views over the `data` object of TRAIN and INFER requests.

mod infer;
mod train;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use infer::{ForecastInferSpec, InterferenceInferSpec, OuInferSpec};
pub use train::{ForecastTrainSpec, InterferenceTrainSpec, OuTrainSpec};

/// Reads a request spec out of a command's `data` object.
///
/// # Arguments
/// * `data` - The command data, unknown keys are ignored.
///
/// # Returns
/// The request or the error naming the first missing or mistyped field.
pub fn from_data<T: DeserializeOwned>(data: &Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(data.clone()))
}
