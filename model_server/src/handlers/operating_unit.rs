//! Per operating unit cost models.

use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use comms::specs::{OuInferSpec, OuTrainSpec};
use log::{debug, error, info, warn};
use machine_learning::{Dataset, FitReport, Regressor, TrainParams, fit_best};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ModelHandler, opunit::OpUnit, parse_spec, storage, to_json};
use crate::{cache::ModelCache, error::HandlerErr};

/// The version of the feature layout written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// The feature schema a model map was trained with, restored along with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub schema_version: u32,
    pub feature_widths: BTreeMap<OpUnit, usize>,
}

/// A trained model map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuArtifact {
    pub data_info: DataInfo,
    pub models: BTreeMap<OpUnit, Regressor>,
}

/// Reads a model map persisted by [`OuHandler`].
pub fn load_artifact(path: &Path) -> io::Result<Option<OuArtifact>> {
    storage::restore(path)
}

pub struct OuHandler {
    cache: ModelCache<OuArtifact>,
}

impl OuHandler {
    pub const TEST_RATIO: f32 = 0.2;
    pub const TRIM_RATIO: f32 = 0.2;
    pub const TXN_SAMPLE_RATE: usize = 2;
    pub const EPOCHS: usize = 500;
    pub const LEARNING_RATE: f32 = 0.1;
    pub const SEED: u64 = 0;

    /// The amount of trailing target columns in every opunit file.
    const TARGET_WIDTH: usize = 1;

    pub fn new() -> Self {
        Self {
            cache: ModelCache::new(),
        }
    }

    pub fn cached(&self) -> &ModelCache<OuArtifact> {
        &self.cache
    }

    fn params() -> TrainParams {
        TrainParams {
            epochs: Self::EPOCHS,
            learning_rate: Self::LEARNING_RATE,
            test_ratio: Self::TEST_RATIO,
            seed: Self::SEED,
        }
    }

    /// Fits one model per `<OPUNIT>.csv` found in `input_dir`.
    fn fit_all(
        methods: &[String],
        input_dir: &Path,
    ) -> Result<(OuArtifact, BTreeMap<OpUnit, FitReport>), HandlerErr> {
        let mut models = BTreeMap::new();
        let mut feature_widths = BTreeMap::new();
        let mut reports = BTreeMap::new();

        for opunit in OpUnit::ALL {
            let path = input_dir.join(format!("{opunit}.csv"));
            if !path.is_file() {
                continue;
            }

            let mut dataset = Dataset::from_csv(&path, Self::TARGET_WIDTH)
                .map_err(|e| HandlerErr::TrainingFailed(format!("{}: {e}", path.display())))?;
            if opunit.is_txn() {
                dataset = dataset.every_nth(Self::TXN_SAMPLE_RATE);
            }
            let dataset = dataset.trim(Self::TRIM_RATIO);

            let (regressor, report) = fit_best(methods, &dataset, &Self::params())
                .map_err(|e| HandlerErr::TrainingFailed(format!("{opunit}: {e}")))?;
            debug!(opunit = opunit.name(), test_mse = report.test_mse; "trained opunit model");

            feature_widths.insert(opunit, dataset.x_size());
            models.insert(opunit, regressor);
            reports.insert(opunit, report);
        }

        if models.is_empty() {
            return Err(HandlerErr::TrainingFailed(format!(
                "no opunit data found in {}",
                input_dir.display()
            )));
        }

        let data_info = DataInfo {
            schema_version: SCHEMA_VERSION,
            feature_widths,
        };
        Ok((OuArtifact { data_info, models }, reports))
    }
}

impl Default for OuHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHandler for OuHandler {
    fn train(&mut self, data: &Map<String, Value>) -> Result<String, HandlerErr> {
        let spec: OuTrainSpec = parse_spec(data)?;

        storage::prepare_save_dir(&spec.save_path)?;
        let results_dir = storage::metric_results_dir(&spec.save_path)?;

        let (artifact, reports) = Self::fit_all(&spec.methods, &spec.input_path)?;
        storage::write_metric_results(&results_dir, &reports)?;
        storage::persist(&spec.save_path, &artifact)
            .map_err(|e| storage::map_io_err(&spec.save_path, e))?;

        info!(
            "trained {} opunit models into {}",
            artifact.models.len(),
            spec.save_path.display()
        );
        self.cache.insert(&spec.save_path, artifact);
        Ok(String::new())
    }

    fn infer(&mut self, data: &Map<String, Value>) -> Result<Value, HandlerErr> {
        let spec: OuInferSpec = parse_spec(data)?;
        let model_path: PathBuf = spec.model_path;

        let artifact = self
            .cache
            .get_or_load(&model_path, load_artifact)
            .map_err(|e| HandlerErr::InferenceFailed(format!("{}: {e}", model_path.display())))?
            .ok_or_else(|| {
                error!("model map at {} has not been trained", model_path.display());
                HandlerErr::ModelMapNotTrained(model_path.clone())
            })?;

        let Value::String(name) = &spec.opunit else {
            warn!("opunit {} is not a string", spec.opunit);
            return Err(HandlerErr::InvalidOpUnit(spec.opunit.to_string()));
        };
        let opunit: OpUnit = name.parse().map_err(HandlerErr::InvalidOpUnit)?;

        let model = artifact
            .models
            .get(&opunit)
            .ok_or_else(|| HandlerErr::ModelNotFound(opunit.to_string()))?;

        let expected = artifact
            .data_info
            .feature_widths
            .get(&opunit)
            .copied()
            .unwrap_or_else(|| model.x_size());
        if let Some(row) = spec.features.iter().find(|row| row.len() != expected) {
            return Err(HandlerErr::InferenceFailed(format!(
                "{opunit} expects {expected} features, got {}",
                row.len()
            )));
        }

        debug!("using model on {opunit}");
        let y_pred = model
            .predict_rows(&spec.features)
            .map_err(|e| HandlerErr::InferenceFailed(e.to_string()))?;
        to_json(&y_pred)
    }
}
