use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The fields of a TRAIN request for the operating-unit family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OuTrainSpec {
    pub methods: Vec<String>,
    pub input_path: PathBuf,
    pub save_path: PathBuf,
}

/// The fields of a TRAIN request for the interference family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterferenceTrainSpec {
    pub methods: Vec<String>,
    pub input_path: PathBuf,
    pub save_path: PathBuf,
    pub ou_model_path: PathBuf,
    pub pipeline_metrics_sample_rate: u32,
}

/// The fields of a TRAIN request for the forecast family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastTrainSpec {
    pub methods: Vec<String>,
    #[serde(default)]
    pub models_config: Option<PathBuf>,
    pub input_path: PathBuf,
    pub save_path: PathBuf,
    pub interval_micro_sec: u64,
}
