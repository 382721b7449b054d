//! Query arrival forecasting over bucketed traces.

mod forecaster;
mod trace;

pub use forecaster::{ForecastWindow, SequenceForecaster};
pub use trace::{MAX_BUCKETS, Trace};
