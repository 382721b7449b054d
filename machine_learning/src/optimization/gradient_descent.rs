use super::Optimizer;

/// Plain gradient descent with a fixed step length.
#[derive(Debug, Clone, Copy)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The length of the steps taken on `update_params`.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        for (w, g) in params.iter_mut().zip(grad) {
            *w -= self.learning_rate * g;
        }
    }
}
