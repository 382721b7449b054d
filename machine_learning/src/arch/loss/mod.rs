mod mse;

use ndarray::{Array2, ArrayView2};

pub use mse::Mse;

pub trait LossFn {
    /// The mean loss between predictions and targets.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// The derivative of the loss with respect to every prediction.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
