use std::{fmt, str::FromStr};

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{LinearRegression, MeanRegressor};
use crate::{
    dataset::{Dataset, matrix_from_rows},
    error::{MlErr, Result},
    training::TrainParams,
};

/// The fitting methods a request may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Method {
    #[serde(rename = "lr")]
    Linear,
    #[serde(rename = "mean")]
    Mean,
}

impl Method {
    pub const ALL: [Method; 2] = [Method::Linear, Method::Mean];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Linear => "lr",
            Method::Mean => "mean",
        }
    }
}

impl FromStr for Method {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == s)
            .ok_or_else(|| MlErr::UnknownMethod(s.to_string()))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fitted model of any method, tagged by its method name once serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum Regressor {
    #[serde(rename = "lr")]
    Linear(LinearRegression),
    #[serde(rename = "mean")]
    Mean(MeanRegressor),
}

impl Regressor {
    /// Fits a new regressor.
    ///
    /// # Arguments
    /// * `method` - The fitting method.
    /// * `dataset` - The training samples.
    /// * `params` - The hyperparameters, only iterative methods read them.
    pub fn fit(method: Method, dataset: &Dataset, params: &TrainParams) -> Result<Self> {
        if dataset.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        let regressor = match method {
            Method::Linear => Regressor::Linear(LinearRegression::fit(
                dataset,
                params.epochs,
                params.learning_rate,
            )?),
            Method::Mean => Regressor::Mean(MeanRegressor::fit(dataset)?),
        };

        Ok(regressor)
    }

    pub fn method(&self) -> Method {
        match self {
            Regressor::Linear(_) => Method::Linear,
            Regressor::Mean(_) => Method::Mean,
        }
    }

    /// The feature width the regressor was fitted on.
    pub fn x_size(&self) -> usize {
        match self {
            Regressor::Linear(model) => model.x_size(),
            Regressor::Mean(model) => model.x_size(),
        }
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self {
            Regressor::Linear(model) => model.predict(x),
            Regressor::Mean(model) => model.predict(x),
        }
    }

    /// Predicts one output row per input row.
    pub fn predict_rows(&self, rows: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let y_pred = self.predict(matrix_from_rows(rows)?.view())?;
        Ok(y_pred.outer_iter().map(|row| row.to_vec()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        assert_eq!("lr".parse::<Method>().unwrap(), Method::Linear);
        assert_eq!("mean".parse::<Method>().unwrap(), Method::Mean);
        assert!(matches!("rf".parse::<Method>(), Err(MlErr::UnknownMethod(name)) if name == "rf"));
    }

    #[test]
    fn serialized_form_is_tagged() {
        let dataset = Dataset::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], 1).unwrap();
        let regressor = Regressor::fit(Method::Mean, &dataset, &TrainParams::default()).unwrap();

        let json = serde_json::to_value(&regressor).unwrap();
        assert_eq!(json["method"], "mean");

        let restored: Regressor = serde_json::from_value(json).unwrap();
        assert_eq!(restored, regressor);
        assert_eq!(
            restored.predict_rows(&[vec![0.0], vec![9.0]]).unwrap(),
            vec![vec![3.0], vec![3.0]]
        );
        assert!(restored.predict_rows(&[]).unwrap().is_empty());
    }
}
