//! Workload forecasting models.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use comms::specs::{ForecastInferSpec, ForecastTrainSpec};
use log::{debug, error, info};
use machine_learning::{
    Method, TrainParams,
    forecast::{ForecastWindow, SequenceForecaster, Trace},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ModelHandler, parse_spec, storage, to_json};
use crate::{cache::ModelCache, error::HandlerErr};

const MIN_INTERVAL_US: u64 = 10_000;
const MAX_INTERVAL_US: u64 = 10_000_000;

/// The cluster every forecasted query is reported under.
const CLUSTER: &str = "0";

/// Per method overrides read from a `models_config` file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct MethodConfig {
    pub epochs: Option<usize>,
    pub learning_rate: Option<f32>,
}

/// The forecasters trained on a trace, keyed by method name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastArtifact {
    pub interval_us: u64,
    pub models: BTreeMap<String, SequenceForecaster>,
}

pub struct ForecastHandler {
    cache: ModelCache<ForecastArtifact>,
}

impl ForecastHandler {
    pub const EPOCHS: usize = 300;
    pub const LEARNING_RATE: f32 = 0.05;
    pub const SEED: u64 = 0;

    pub fn new() -> Self {
        Self {
            cache: ModelCache::new(),
        }
    }

    pub fn cached(&self) -> &ModelCache<ForecastArtifact> {
        &self.cache
    }

    fn window(interval_us: u64) -> Result<ForecastWindow, HandlerErr> {
        if !(MIN_INTERVAL_US..=MAX_INTERVAL_US).contains(&interval_us) {
            return Err(HandlerErr::DataFormat(format!(
                "interval_micro_sec {interval_us} is not within [{MIN_INTERVAL_US}, {MAX_INTERVAL_US}]"
            )));
        }

        Ok(ForecastWindow::for_interval(interval_us))
    }

    fn params(config: Option<&MethodConfig>) -> TrainParams {
        let config = config.copied().unwrap_or_default();
        TrainParams {
            epochs: config.epochs.unwrap_or(Self::EPOCHS),
            learning_rate: config.learning_rate.unwrap_or(Self::LEARNING_RATE),
            test_ratio: 0.0,
            seed: Self::SEED,
        }
    }
}

impl Default for ForecastHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHandler for ForecastHandler {
    fn train(&mut self, data: &Map<String, Value>) -> Result<String, HandlerErr> {
        let spec: ForecastTrainSpec = parse_spec(data)?;
        let window = Self::window(spec.interval_micro_sec)?;
        let configs = match &spec.models_config {
            Some(path) => read_models_config(path)?,
            None => BTreeMap::new(),
        };

        storage::prepare_save_dir(&spec.save_path)?;

        if spec.methods.is_empty() {
            return Err(HandlerErr::TrainingFailed("no methods requested".to_string()));
        }

        let trace = Trace::from_csv(&spec.input_path, spec.interval_micro_sec)
            .map_err(|e| HandlerErr::TrainingFailed(format!("{}: {e}", spec.input_path.display())))?;

        let mut models = BTreeMap::new();
        for name in &spec.methods {
            let method: Method = name
                .parse()
                .map_err(|e| HandlerErr::TrainingFailed(format!("{e}")))?;
            let params = Self::params(configs.get(name));

            let forecaster = SequenceForecaster::fit(&trace, window, method, &params)
                .map_err(|e| HandlerErr::TrainingFailed(format!("{name}: {e}")))?;
            debug!(method = name.as_str(); "trained forecaster");

            models.insert(name.clone(), forecaster);
        }

        let artifact = ForecastArtifact {
            interval_us: spec.interval_micro_sec,
            models,
        };
        storage::persist(&spec.save_path, &artifact)
            .map_err(|e| storage::map_io_err(&spec.save_path, e))?;

        info!(
            "trained {} forecasters into {}",
            artifact.models.len(),
            spec.save_path.display()
        );
        self.cache.insert(&spec.save_path, artifact);
        Ok(String::new())
    }

    fn infer(&mut self, data: &Map<String, Value>) -> Result<Value, HandlerErr> {
        let spec: ForecastInferSpec = parse_spec(data)?;
        let window = Self::window(spec.interval_micro_sec)?;
        let model_path: PathBuf = spec.model_path;

        let artifact = self
            .cache
            .get_or_load(&model_path, storage::restore::<ForecastArtifact>)
            .map_err(|e| HandlerErr::InferenceFailed(format!("{}: {e}", model_path.display())))?
            .ok_or_else(|| {
                error!("models at {} have not been trained", model_path.display());
                HandlerErr::ModelsNotTrained(model_path.clone())
            })?;

        if artifact.interval_us != spec.interval_micro_sec {
            return Err(HandlerErr::InferenceFailed(format!(
                "models were trained with interval {} but {} was requested",
                artifact.interval_us, spec.interval_micro_sec
            )));
        }

        // Only the first requested model is used.
        let name = spec
            .model_names
            .first()
            .ok_or_else(|| HandlerErr::DataFormat("model_names is empty".to_string()))?;
        let forecaster = artifact
            .models
            .get(name)
            .ok_or_else(|| HandlerErr::ModelNotFound(name.clone()))?;

        let trace = Trace::from_csv(&spec.input_path, spec.interval_micro_sec)
            .map_err(|e| HandlerErr::InferenceFailed(format!("{}: {e}", spec.input_path.display())))?;
        let predictions = forecaster
            .forecast(&trace, window.horizon_len)
            .map_err(|e| HandlerErr::InferenceFailed(e.to_string()))?;

        let mut result = Map::new();
        result.insert(CLUSTER.to_string(), to_json(&predictions)?);
        Ok(Value::Object(result))
    }
}

/// Reads `{"<method>": {"epochs": n, "learning_rate": f}}`.
fn read_models_config(path: &Path) -> Result<BTreeMap<String, MethodConfig>, HandlerErr> {
    let bytes = fs::read(path)
        .map_err(|e| HandlerErr::DataFormat(format!("{}: {e}", path.display())))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| HandlerErr::DataFormat(format!("{}: {e}", path.display())))
}
