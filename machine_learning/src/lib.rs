pub mod arch;
pub mod dataset;
pub mod error;
pub mod forecast;
pub mod optimization;
pub mod training;

pub use arch::{Method, Regressor};
pub use dataset::Dataset;
pub use error::{MlErr, Result};
pub use training::{FitReport, TrainParams, fit_best};
