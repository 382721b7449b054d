use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fields of an INFER request for the operating-unit family.
///
/// `opunit` is kept untyped so that a non string key is reported as an invalid opunit rather
/// than a malformed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OuInferSpec {
    pub features: Vec<Vec<f32>>,
    pub opunit: Value,
    pub model_path: PathBuf,
}

/// The fields of an INFER request for the interference family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterferenceInferSpec {
    pub features: Vec<Vec<f32>>,
    pub model_path: PathBuf,
}

/// The fields of an INFER request for the forecast family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastInferSpec {
    pub input_path: PathBuf,
    pub model_names: Vec<String>,
    #[serde(default)]
    pub models_config: Option<PathBuf>,
    pub interval_micro_sec: u64,
    pub model_path: PathBuf,
}
