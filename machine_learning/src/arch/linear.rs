use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::{
    arch::loss::{LossFn, Mse},
    dataset::Dataset,
    error::{MlErr, Result},
    optimization::{GradientDescent, Optimizer},
};

/// A multi target linear model over standardized features.
///
/// The weights are stored row major with shape `(x_size, y_size)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    x_size: usize,
    y_size: usize,
    x_mean: Vec<f32>,
    x_scale: Vec<f32>,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl LinearRegression {
    /// Fits the model by gradient descent on the mean squared error.
    ///
    /// # Arguments
    /// * `dataset` - The training samples.
    /// * `epochs` - The amount of full batch steps.
    /// * `learning_rate` - The step length.
    ///
    /// # Returns
    /// The fitted model, or an error if the dataset is empty or the step length made the
    /// parameters leave the finite range.
    pub fn fit(dataset: &Dataset, epochs: usize, learning_rate: f32) -> Result<Self> {
        let x = dataset.x();
        let y = dataset.y();
        let (x_size, y_size) = (dataset.x_size(), dataset.y_size());

        let x_mean = x.mean_axis(Axis(0)).ok_or(MlErr::EmptyDataset)?;
        let y_mean = y.mean_axis(Axis(0)).ok_or(MlErr::EmptyDataset)?;
        let x_scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f32::EPSILON { s } else { 1.0 });
        let xs = (&x - &x_mean) / &x_scale;

        let n_weights = x_size * y_size;
        let mut params = vec![0.0; n_weights];
        params.extend(y_mean.iter());

        let mut optimizer = GradientDescent::new(learning_rate);
        for _ in 0..epochs {
            let (w, b) = params.split_at(n_weights);
            let w = ArrayView2::from_shape((x_size, y_size), w)?;
            let y_pred = xs.dot(&w) + &ArrayView1::from(b);

            let delta = Mse.loss_prime(y_pred.view(), y);
            let grad: Vec<f32> = xs
                .t()
                .dot(&delta)
                .iter()
                .chain(delta.sum_axis(Axis(0)).iter())
                .copied()
                .collect();

            optimizer.update_params(&mut params, &grad);
        }

        if !params.iter().all(|p| p.is_finite()) {
            return Err(MlErr::Diverged("linear regression"));
        }

        let bias = params.split_off(n_weights);
        Ok(Self {
            x_size,
            y_size,
            x_mean: x_mean.to_vec(),
            x_scale: x_scale.to_vec(),
            weights: params,
            bias,
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

        let xs = (&x - &ArrayView1::from(&self.x_mean[..])) / &ArrayView1::from(&self.x_scale[..]);
        let w = ArrayView2::from_shape((self.x_size, self.y_size), self.weights.as_slice())?;
        Ok(xs.dot(&w) + &ArrayView1::from(&self.bias[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_linear_relation() {
        let rows: Vec<_> = (0..20)
            .map(|i| {
                let (a, b) = (i as f32, (i % 3) as f32);
                vec![a, b, 3.0 * a - 2.0 * b + 5.0]
            })
            .collect();
        let dataset = Dataset::from_rows(&rows, 1).unwrap();

        let model = LinearRegression::fit(&dataset, 2000, 0.1).unwrap();
        let y_pred = model.predict(dataset.x()).unwrap();

        assert!(Mse.loss(y_pred.view(), dataset.y()) < 1e-2);
    }

    #[test]
    fn constant_features_do_not_blow_up() {
        let rows = vec![vec![1.0, 4.0], vec![1.0, 6.0]];
        let dataset = Dataset::from_rows(&rows, 1).unwrap();

        let model = LinearRegression::fit(&dataset, 100, 0.1).unwrap();
        let y_pred = model.predict(dataset.x()).unwrap();

        assert!(y_pred.iter().all(|y| (y - 5.0).abs() < 1e-4));
    }

    #[test]
    fn correlated_features_diverge_into_an_error() {
        let rows: Vec<_> = (0..40)
            .map(|i| {
                let a = i as f32;
                let mut row: Vec<f32> = (0..30).map(|j| a + 0.001 * j as f32 * (i % 2) as f32).collect();
                row.push(2.0 * a + 1.0);
                row
            })
            .collect();
        let dataset = Dataset::from_rows(&rows, 1).unwrap();

        let err = LinearRegression::fit(&dataset, 500, 0.1).unwrap_err();
        assert!(matches!(err, MlErr::Diverged(_)));
    }

    #[test]
    fn rejects_wrong_widths() {
        let dataset = Dataset::from_rows(&[vec![1.0, 2.0, 3.0]], 1).unwrap();
        let model = LinearRegression::fit(&dataset, 1, 0.1).unwrap();

        let err = model.predict(Array2::zeros((1, 3)).view()).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 3, expected: 2, .. }));
    }
}
