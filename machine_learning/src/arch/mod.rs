mod linear;
pub mod loss;
mod mean;
mod regressor;

pub use linear::LinearRegression;
pub use mean::MeanRegressor;
pub use regressor::{Method, Regressor};
