use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    dataset::Dataset,
    error::{MlErr, Result},
};

/// Predicts the training mean of every target regardless of the features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanRegressor {
    x_size: usize,
    means: Vec<f32>,
}

impl MeanRegressor {
    pub fn fit(dataset: &Dataset) -> Result<Self> {
        let means = dataset
            .y()
            .mean_axis(Axis(0))
            .ok_or(MlErr::EmptyDataset)?;

        Ok(Self {
            x_size: dataset.x_size(),
            means: means.to_vec(),
        })
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        if x.ncols() != self.x_size {
            return Err(MlErr::SizeMismatch {
                a: "features",
                b: "model",
                got: x.ncols(),
                expected: self.x_size,
            });
        }

        Ok(Array2::from_shape_fn((x.nrows(), self.means.len()), |(_, j)| {
            self.means[j]
        }))
    }
}
