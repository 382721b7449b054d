use std::{fmt, str::FromStr};

use log::error;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Map, Value};

/// The commands the manager can issue, spelled exactly as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Train,
    Quit,
    Print,
    Infer,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Train => "TRAIN",
            Command::Quit => "QUIT",
            Command::Print => "PRINT",
            Command::Infer => "INFER",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request body `{"cmd": ..., "data": {...}}`.
///
/// Only built through a full validated parse, a malformed body never yields a partially
/// filled message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMsg {
    pub cmd: Command,
    pub data: Map<String, Value>,
}

impl CommandMsg {
    pub fn new(cmd: Command, data: Map<String, Value>) -> Self {
        Self { cmd, data }
    }

    /// Parses a request body.
    ///
    /// # Arguments
    /// * `json` - The payload segment of an envelope.
    ///
    /// # Returns
    /// The message, or `None` if `cmd` or `data` are missing, mistyped or unknown.
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(msg) => Some(msg),
            Err(e) => {
                error!("invalid message {json}: {e}");
                None
            }
        }
    }

    /// Serializes the message into its wire body.
    pub fn to_json(&self) -> String {
        // Derived impls over string keyed maps cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// The callback the manager should invoke upon receiving a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Callback {
    Noop = 0,
    Connected = 1,
}

impl Serialize for Callback {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

impl<'de> Deserialize<'de> for Callback {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Callback::Noop),
            1 => Ok(Callback::Connected),
            other => Err(de::Error::custom(format!("unknown callback id {other}"))),
        }
    }
}

/// The reply shape shared by every command.
///
/// `err` is empty if and only if `success` is set, the constructors are the only way to
/// build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    action: Callback,
    result: Value,
    success: bool,
    err: String,
}

impl Response {
    /// A successful reply carrying `result`.
    pub fn ok(result: impl Into<Value>) -> Self {
        Self {
            action: Callback::Noop,
            result: result.into(),
            success: true,
            err: String::new(),
        }
    }

    /// A failed reply with an empty string result.
    ///
    /// # Arguments
    /// * `err` - A non empty error code.
    pub fn fail(err: impl Into<String>) -> Self {
        Self::fail_with("", err)
    }

    /// A failed reply carrying `result` next to the error code.
    pub fn fail_with(result: impl Into<Value>, err: impl Into<String>) -> Self {
        let mut err = err.into();
        if err.is_empty() {
            err.push_str("FAIL_UNKNOWN");
        }

        Self {
            action: Callback::Noop,
            result: result.into(),
            success: false,
            err,
        }
    }

    /// The unsolicited reply announcing that the server is ready.
    pub fn connected() -> Self {
        Self {
            action: Callback::Connected,
            ..Self::ok("")
        }
    }

    pub fn action(&self) -> Callback {
        self.action
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn err(&self) -> &str {
        &self.err
    }
}

/// The model families the server can train and query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelType {
    Forecast,
    OperatingUnit,
    Interference,
}

impl ModelType {
    pub const ALL: [ModelType; 3] = [
        ModelType::Forecast,
        ModelType::OperatingUnit,
        ModelType::Interference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Forecast => "FORECAST",
            ModelType::OperatingUnit => "OPERATING_UNIT",
            ModelType::Interference => "INTERFERENCE",
        }
    }
}

impl FromStr for ModelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model_type| model_type.as_str() == s)
            .ok_or_else(|| format!("unknown model type {s}"))
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command() {
        for cmd in [Command::Train, Command::Quit, Command::Print, Command::Infer] {
            let json = format!(r#"{{"cmd":"{cmd}","data":{{}}}}"#);
            let msg = CommandMsg::from_json(&json).unwrap();
            assert_eq!(msg.cmd, cmd);
            assert!(msg.data.is_empty());
        }
    }

    #[test]
    fn rejects_invalid_bodies() {
        let bodies = [
            r#"{"cmd":"train","data":{}}"#,
            r#"{"cmd":"BOGUS","data":{}}"#,
            r#"{"cmd":"TRAIN"}"#,
            r#"{"data":{}}"#,
            r#"{"cmd":"TRAIN","data":[]}"#,
            r#"{"cmd":1,"data":{}}"#,
            r#"["TRAIN",{}]"#,
            "not json",
        ];

        for body in bodies {
            assert!(CommandMsg::from_json(body).is_none(), "{body}");
        }
    }

    #[test]
    fn response_wire_shape() {
        let json = serde_json::to_string(&Response::ok("")).unwrap();
        assert_eq!(json, r#"{"action":0,"result":"","success":true,"err":""}"#);

        let json = serde_json::to_string(&Response::connected()).unwrap();
        assert_eq!(json, r#"{"action":1,"result":"","success":true,"err":""}"#);

        let json = serde_json::to_string(&Response::fail("INVALID_OPUNIT")).unwrap();
        assert_eq!(
            json,
            r#"{"action":0,"result":"","success":false,"err":"INVALID_OPUNIT"}"#
        );
    }

    #[test]
    fn failures_always_carry_a_code() {
        let response = Response::fail("");
        assert!(!response.success());
        assert!(!response.err().is_empty());
    }

    #[test]
    fn model_type_names() {
        for model_type in ModelType::ALL {
            assert_eq!(model_type.as_str().parse::<ModelType>().unwrap(), model_type);
        }
        assert!("operating_unit".parse::<ModelType>().is_err());
    }
}
