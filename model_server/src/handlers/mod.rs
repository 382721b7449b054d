//! One handler per model family, reached through the `ModelHandler` seam.

pub mod forecast;
pub mod interference;
pub mod opunit;
pub mod operating_unit;
pub mod storage;

use comms::{msg::ModelType, specs};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub use forecast::ForecastHandler;
pub use interference::InterferenceHandler;
pub use operating_unit::OuHandler;

use crate::error::HandlerErr;

/// The two narrow contracts every model family implements.
pub trait ModelHandler: Send {
    /// Fits, persists and caches a model described by the request.
    ///
    /// # Returns
    /// The message sent back as the response's result.
    fn train(&mut self, data: &Map<String, Value>) -> Result<String, HandlerErr>;

    /// Predicts with a previously trained model, loading it once per path.
    fn infer(&mut self, data: &Map<String, Value>) -> Result<Value, HandlerErr>;
}

/// The fixed registry of handlers, one per model type.
pub struct Handlers {
    forecast: Box<dyn ModelHandler>,
    operating_unit: Box<dyn ModelHandler>,
    interference: Box<dyn ModelHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::from_parts(
            Box::new(ForecastHandler::new()),
            Box::new(OuHandler::new()),
            Box::new(InterferenceHandler::new()),
        )
    }

    /// Builds a registry out of arbitrary handlers.
    pub fn from_parts(
        forecast: Box<dyn ModelHandler>,
        operating_unit: Box<dyn ModelHandler>,
        interference: Box<dyn ModelHandler>,
    ) -> Self {
        Self {
            forecast,
            operating_unit,
            interference,
        }
    }

    pub fn get_mut(&mut self, model_type: ModelType) -> &mut dyn ModelHandler {
        match model_type {
            ModelType::Forecast => self.forecast.as_mut(),
            ModelType::OperatingUnit => self.operating_unit.as_mut(),
            ModelType::Interference => self.interference.as_mut(),
        }
    }
}

impl Default for Handlers {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads a typed request out of a command's data, any missing or mistyped field is a
/// format error.
pub(crate) fn parse_spec<T: DeserializeOwned>(data: &Map<String, Value>) -> Result<T, HandlerErr> {
    specs::from_data(data).map_err(|e| HandlerErr::DataFormat(e.to_string()))
}

/// Turns predictions into plain JSON numbers.
pub(crate) fn to_json<T: serde::Serialize>(predictions: &T) -> Result<Value, HandlerErr> {
    serde_json::to_value(predictions).map_err(|e| HandlerErr::InferenceFailed(e.to_string()))
}
