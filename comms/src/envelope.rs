//! The `"<sender>-<receiver>-<json>"` envelope shared by requests and responses.

use log::{debug, error};

use crate::msg::{CommandMsg, Response};

/// Receiver id used for messages that answer no request, such as the connection handshake.
pub const RESERVED_ID: i64 = 0;

/// Id pair returned alongside a discarded envelope.
pub const INVALID_ID: i64 = -1;

const SEPARATOR: char = '-';

const FALLBACK_BODY: &str =
    r#"{"action":0,"result":"","success":false,"err":"FAIL_DATA_FORMAT_ERROR"}"#;

/// Serializes `response` and wraps it in an envelope.
///
/// # Arguments
/// * `sender_id` - The id on this end.
/// * `receiver_id` - The callback id to invoke on the other end.
/// * `response` - The reply body.
///
/// # Returns
/// The wire bytes of the envelope.
pub fn encode(sender_id: i64, receiver_id: i64, response: &Response) -> Vec<u8> {
    let body = serde_json::to_string(response).unwrap_or_else(|e| {
        error!("failed to serialize response {response:?}: {e}");
        FALLBACK_BODY.to_string()
    });

    format!("{sender_id}{SEPARATOR}{receiver_id}{SEPARATOR}{body}").into_bytes()
}

/// Splits an envelope and parses its request body.
///
/// Only the first two separators are significant, the body may contain more of them.
///
/// # Arguments
/// * `payload` - The content frame as text.
///
/// # Returns
/// `(sender_id, receiver_id, message)`. Both ids are `-1` and the message is `None` when the
/// ids are not integers or the body segment is missing. The message alone is `None` when the
/// body is not a valid request.
pub fn decode(payload: &str) -> (i64, i64, Option<CommandMsg>) {
    debug!("recv: {payload}");

    let mut tokens = payload.splitn(3, SEPARATOR);
    let ids = (
        tokens.next().and_then(|t| t.parse::<i64>().ok()),
        tokens.next().and_then(|t| t.parse::<i64>().ok()),
        tokens.next(),
    );

    let (Some(sender_id), Some(receiver_id), Some(body)) = ids else {
        error!("invalid message payload format: {payload}, ids not int");
        return (INVALID_ID, INVALID_ID, None);
    };

    (sender_id, receiver_id, CommandMsg::from_json(body))
}
