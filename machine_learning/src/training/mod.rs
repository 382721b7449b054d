mod fit;

pub use fit::{FitReport, fit_best};

/// Hyperparameters shared by every fitting method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    pub epochs: usize,
    pub learning_rate: f32,
    /// The fraction of rows held out to rank the methods.
    pub test_ratio: f32,
    pub seed: u64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
            test_ratio: 0.2,
            seed: 0,
        }
    }
}
