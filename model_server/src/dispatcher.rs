use std::panic::{self, AssertUnwindSafe};

use comms::msg::{Command, CommandMsg, ModelType, Response};
use log::{error, info};
use serde_json::{Map, Value};

use crate::{error::HandlerErr, handlers::Handlers};

/// Maps commands onto handler calls and normalizes every outcome into a `Response`.
pub struct Dispatcher {
    handlers: Handlers,
}

impl Dispatcher {
    pub fn new(handlers: Handlers) -> Self {
        Self { handlers }
    }

    /// Executes a single command to completion.
    ///
    /// # Args
    /// * `msg` - A validated command.
    ///
    /// # Returns
    /// The reply and whether the server should keep serving.
    pub fn execute(&mut self, msg: CommandMsg) -> (Response, bool) {
        let CommandMsg { cmd, data } = msg;

        match cmd {
            Command::Print => {
                let message = match data.get("message") {
                    Some(Value::String(message)) => message.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };

                info!("MESSAGE PRINT: {message}");
                (Response::ok(format!("MODEL_REPLY_{message}")), true)
            }
            Command::Quit => (Response::ok(""), false),
            Command::Train => (self.train(&data), true),
            Command::Infer => (self.infer(&data), true),
        }
    }

    fn train(&mut self, data: &Map<String, Value>) -> Response {
        let outcome = model_type(data).and_then(|model_type| {
            let handler = self.handlers.get_mut(model_type);
            panic::catch_unwind(AssertUnwindSafe(|| handler.train(data))).unwrap_or_else(|_| {
                Err(HandlerErr::TrainingFailed(format!(
                    "{model_type} trainer panicked"
                )))
            })
        });

        match outcome {
            Ok(message) => Response::ok(message),
            Err(e) => {
                error!("TRAIN failed: {e}");
                Response::fail(e.code())
            }
        }
    }

    fn infer(&mut self, data: &Map<String, Value>) -> Response {
        let outcome = model_type(data).and_then(|model_type| {
            let handler = self.handlers.get_mut(model_type);
            panic::catch_unwind(AssertUnwindSafe(|| handler.infer(data))).unwrap_or_else(|_| {
                Err(HandlerErr::InferenceFailed(format!(
                    "{model_type} model panicked"
                )))
            })
        });

        match outcome {
            Ok(result) => Response::ok(result),
            Err(e) => {
                error!("INFER failed: {e}");
                Response::fail_with(Value::Array(Vec::new()), e.code())
            }
        }
    }
}

fn model_type(data: &Map<String, Value>) -> Result<ModelType, HandlerErr> {
    match data.get("type") {
        Some(Value::String(name)) => name.parse().map_err(HandlerErr::ModelTypeNotFound),
        Some(other) => Err(HandlerErr::DataFormat(format!("type {other} is not a string"))),
        None => Err(HandlerErr::DataFormat("missing type".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handlers::ModelHandler;

    struct Panicking;

    impl ModelHandler for Panicking {
        fn train(&mut self, _: &Map<String, Value>) -> Result<String, HandlerErr> {
            panic!("boom");
        }

        fn infer(&mut self, _: &Map<String, Value>) -> Result<Value, HandlerErr> {
            panic!("boom");
        }
    }

    struct Echo;

    impl ModelHandler for Echo {
        fn train(&mut self, _: &Map<String, Value>) -> Result<String, HandlerErr> {
            Ok("trained".to_string())
        }

        fn infer(&mut self, data: &Map<String, Value>) -> Result<Value, HandlerErr> {
            Ok(data["features"].clone())
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Handlers::from_parts(
            Box::new(Panicking),
            Box::new(Echo),
            Box::new(Panicking),
        ))
    }

    fn msg(cmd: Command, data: Value) -> CommandMsg {
        CommandMsg::new(cmd, data.as_object().unwrap().clone())
    }

    #[test]
    fn print_echoes_the_message() {
        let (response, keep_running) =
            dispatcher().execute(msg(Command::Print, json!({ "message": "hi" })));
        assert!(keep_running);
        assert_eq!(response, Response::ok("MODEL_REPLY_hi"));

        let (response, _) = dispatcher().execute(msg(Command::Print, json!({})));
        assert_eq!(response, Response::ok("MODEL_REPLY_"));
    }

    #[test]
    fn quit_stops_with_success() {
        let (response, keep_running) = dispatcher().execute(msg(Command::Quit, json!({})));
        assert!(!keep_running);
        assert_eq!(response, Response::ok(""));
    }

    #[test]
    fn train_codes() {
        let mut dispatcher = dispatcher();
        let cases = [
            (json!({ "type": "NEURAL" }), "FAIL_MODEL_NOT_FOUND"),
            (json!({}), "FAIL_DATA_FORMAT_ERROR"),
            (json!({ "type": 3 }), "FAIL_DATA_FORMAT_ERROR"),
            (json!({ "type": "FORECAST" }), "FAIL_TRAINING_FAILED"),
        ];

        for (data, code) in cases {
            let (response, keep_running) = dispatcher.execute(msg(Command::Train, data));
            assert!(keep_running);
            assert_eq!(response, Response::fail(code));
        }

        let (response, _) =
            dispatcher.execute(msg(Command::Train, json!({ "type": "OPERATING_UNIT" })));
        assert_eq!(response, Response::ok("trained"));
    }

    #[test]
    fn infer_forwards_results_and_codes() {
        let mut dispatcher = dispatcher();

        let data = json!({ "type": "OPERATING_UNIT", "features": [[1.0]] });
        let (response, _) = dispatcher.execute(msg(Command::Infer, data));
        assert_eq!(response, Response::ok(json!([[1.0]])));

        let (response, _) = dispatcher.execute(msg(Command::Infer, json!({ "type": "BOGUS" })));
        assert_eq!(response, Response::fail_with(json!([]), "FAIL_MODEL_NOT_FOUND"));

        let (response, _) =
            dispatcher.execute(msg(Command::Infer, json!({ "type": "INTERFERENCE" })));
        assert_eq!(response, Response::fail_with(json!([]), "FAIL_INFERENCE_FAILED"));
    }
}
