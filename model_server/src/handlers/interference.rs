//! Models predicting the slowdown of concurrent pipelines.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use comms::specs::{InterferenceInferSpec, InterferenceTrainSpec};
use log::{error, info};
use machine_learning::{Dataset, Regressor, TrainParams, fit_best};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ModelHandler, operating_unit, parse_spec, storage, to_json};
use crate::{cache::ModelCache, error::HandlerErr};

/// A trained interference model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterferenceArtifact {
    /// The schema of the operating-unit model map this model was trained against.
    pub ou_schema_version: u32,
    pub regressor: Regressor,
}

pub struct InterferenceHandler {
    cache: ModelCache<InterferenceArtifact>,
}

impl InterferenceHandler {
    pub const IMPACT_MODEL_RATIO: f32 = 0.1;
    pub const WARMUP_PERIOD: usize = 3;
    pub const EPOCHS: usize = 500;
    pub const LEARNING_RATE: f32 = 0.1;
    pub const SEED: u64 = 0;

    const MAX_SAMPLE_RATE: u32 = 100;

    pub fn new() -> Self {
        Self {
            cache: ModelCache::new(),
        }
    }

    pub fn cached(&self) -> &ModelCache<InterferenceArtifact> {
        &self.cache
    }

    fn params() -> TrainParams {
        TrainParams {
            epochs: Self::EPOCHS,
            learning_rate: Self::LEARNING_RATE,
            test_ratio: Self::IMPACT_MODEL_RATIO,
            seed: Self::SEED,
        }
    }

    /// Reads a single CSV file, or every CSV file of a directory, skipping each file's
    /// warmup rows.
    fn load_input(input_path: &Path) -> Result<Dataset, HandlerErr> {
        let files = if input_path.is_dir() {
            csv_files(input_path)
                .map_err(|e| HandlerErr::TrainingFailed(format!("{}: {e}", input_path.display())))?
        } else {
            vec![input_path.to_path_buf()]
        };

        let datasets = files
            .iter()
            .map(|path| {
                Dataset::from_csv(path, 1)
                    .map(|dataset| dataset.skip(Self::WARMUP_PERIOD))
                    .map_err(|e| HandlerErr::TrainingFailed(format!("{}: {e}", path.display())))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Dataset::concat(&datasets).map_err(|e| HandlerErr::TrainingFailed(e.to_string()))
    }
}

impl Default for InterferenceHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHandler for InterferenceHandler {
    fn train(&mut self, data: &Map<String, Value>) -> Result<String, HandlerErr> {
        let spec: InterferenceTrainSpec = parse_spec(data)?;

        let rate = spec.pipeline_metrics_sample_rate;
        if !(1..=Self::MAX_SAMPLE_RATE).contains(&rate) {
            return Err(HandlerErr::DataFormat(format!(
                "pipeline_metrics_sample_rate {rate} is not within 1..=100"
            )));
        }

        storage::prepare_save_dir(&spec.save_path)?;
        let results_dir = storage::metric_results_dir(&spec.save_path)?;

        let ou = operating_unit::load_artifact(&spec.ou_model_path)
            .map_err(|e| HandlerErr::TrainingFailed(e.to_string()))?
            .ok_or_else(|| {
                HandlerErr::TrainingFailed(format!(
                    "no operating unit model at {}",
                    spec.ou_model_path.display()
                ))
            })?;

        let mut dataset = Self::load_input(&spec.input_path)?;
        dataset.scale_targets(Self::MAX_SAMPLE_RATE as f32 / rate as f32);

        let (regressor, report) = fit_best(&spec.methods, &dataset, &Self::params())
            .map_err(|e| HandlerErr::TrainingFailed(e.to_string()))?;
        storage::write_metric_results(&results_dir, &report)?;

        let artifact = InterferenceArtifact {
            ou_schema_version: ou.data_info.schema_version,
            regressor,
        };
        storage::persist(&spec.save_path, &artifact)
            .map_err(|e| storage::map_io_err(&spec.save_path, e))?;

        info!(
            "trained interference model ({}) into {}",
            report.method,
            spec.save_path.display()
        );
        self.cache.insert(&spec.save_path, artifact);
        Ok(String::new())
    }

    fn infer(&mut self, data: &Map<String, Value>) -> Result<Value, HandlerErr> {
        let spec: InterferenceInferSpec = parse_spec(data)?;
        let model_path: PathBuf = spec.model_path;

        let artifact = self
            .cache
            .get_or_load(&model_path, storage::restore::<InterferenceArtifact>)
            .map_err(|e| HandlerErr::InferenceFailed(format!("{}: {e}", model_path.display())))?
            .ok_or_else(|| {
                error!("model map at {} has not been trained", model_path.display());
                HandlerErr::ModelMapNotTrained(model_path.clone())
            })?;

        let y_pred = artifact
            .regressor
            .predict_rows(&spec.features)
            .map_err(|e| HandlerErr::InferenceFailed(e.to_string()))?;
        to_json(&y_pred)
    }
}

fn csv_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
