use log::{debug, warn};
use serde::Serialize;

use super::TrainParams;
use crate::{
    arch::{
        Method, Regressor,
        loss::{LossFn, Mse},
    },
    dataset::Dataset,
    error::{MlErr, Result},
};

/// How the chosen regressor scored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    pub method: Method,
    pub test_mse: f32,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Fits every requested method and keeps the one with the lowest held out error.
///
/// # Arguments
/// * `methods` - The method names, all of them must be known.
/// * `dataset` - The samples, split in train and test halves by `params`.
/// * `params` - The hyperparameters.
///
/// # Returns
/// The best regressor along with its score. When the test half ends up empty the methods
/// are ranked on the train half. Methods that diverge or score a non finite error are
/// never chosen, if every method does the last divergence is returned.
pub fn fit_best(
    methods: &[String],
    dataset: &Dataset,
    params: &TrainParams,
) -> Result<(Regressor, FitReport)> {
    let methods = methods
        .iter()
        .map(|name| name.parse::<Method>())
        .collect::<Result<Vec<_>>>()?;

    if methods.is_empty() {
        return Err(MlErr::NoMethods);
    }

    if dataset.is_empty() {
        return Err(MlErr::EmptyDataset);
    }

    let (train, test) = dataset.split(params.test_ratio, params.seed);
    let eval = if test.is_empty() { &train } else { &test };

    let mut best: Option<(Regressor, FitReport)> = None;
    let mut diverged = None;
    for method in methods {
        let regressor = match Regressor::fit(method, &train, params) {
            Ok(regressor) => regressor,
            Err(e @ MlErr::Diverged(_)) => {
                warn!(method = method.as_str(); "discarding regressor: {e}");
                diverged = Some(e);
                continue;
            }
            Err(e) => return Err(e),
        };

        let y_pred = regressor.predict(eval.x())?;
        let test_mse = Mse.loss(y_pred.view(), eval.y());
        debug!(method = method.as_str(), test_mse = test_mse; "fitted regressor");

        if !test_mse.is_finite() {
            warn!(method = method.as_str(); "discarding regressor with a non finite error");
            diverged = Some(MlErr::Diverged(method.as_str()));
            continue;
        }

        if best.as_ref().is_none_or(|(_, report)| test_mse < report.test_mse) {
            let report = FitReport {
                method,
                test_mse,
                train_rows: train.len(),
                test_rows: test.len(),
            };
            best = Some((regressor, report));
        }
    }

    best.ok_or(diverged.unwrap_or(MlErr::NoMethods))
}
