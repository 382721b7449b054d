use ndarray::{Array2, ArrayView2};

use super::LossFn;

/// Mean squared error, the score every fitted regressor is ranked by.
#[derive(Debug, Default, Clone, Copy)]
pub struct Mse;

impl LossFn for Mse {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        if y_pred.is_empty() {
            return 0.0;
        }

        (&y_pred - &y).mapv(|e| e * e).mean().unwrap_or_default()
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.len().max(1) as f32;
        (&y_pred - &y) * (2.0 / n)
    }
}
