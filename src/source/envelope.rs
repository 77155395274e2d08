//! `{ success, <key>: … }` response envelopes.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::SourceError;

/// Keys a bare acknowledgement may carry besides a record.
const ENVELOPE_KEYS: [&str; 3] = ["success", "message", "error"];

/// The `message` (or `error`) field of an error body.
pub fn error_message(body: &Value) -> Option<String> {
    body.get("message")
        .or_else(|| body.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn check_success(body: &Value) -> Result<(), SourceError> {
    if body.get("success") == Some(&Value::Bool(false)) {
        let message = error_message(body).unwrap_or_else(|| "request rejected".to_string());
        return Err(SourceError::Rejected(message));
    }
    Ok(())
}

/// Decode a list response. With no key, a bare array is expected, though a
/// `data` envelope is accepted too.
pub fn decode_list<R: DeserializeOwned>(
    body: Value,
    key: Option<&str>,
) -> Result<Vec<R>, SourceError> {
    check_success(&body)?;
    let list = match (key, body) {
        (Some(key), Value::Object(mut object)) => object
            .remove(key)
            .ok_or_else(|| SourceError::Decode(format!("missing `{}` in response", key)))?,
        (None, Value::Object(mut object)) => match object.remove("data") {
            Some(data) => data,
            None => Value::Object(object),
        },
        (_, other) => other,
    };
    Ok(serde_json::from_value(list)?)
}

/// Decode a write response. Returns `None` when the body carries no record:
/// null, or an object holding only `success`/`message`/`error`. Any other
/// body must decode as the record.
pub fn decode_item<R: DeserializeOwned>(
    body: Value,
    key: Option<&str>,
) -> Result<Option<R>, SourceError> {
    check_success(&body)?;
    if let Some(inner) = key.and_then(|key| body.get(key)) {
        if inner.is_null() {
            return Ok(None);
        }
        return Ok(Some(serde_json::from_value(inner.clone())?));
    }
    if !carries_record(&body) {
        return Ok(None);
    }
    // Some routes answer with the record itself.
    Ok(Some(serde_json::from_value(body)?))
}

fn carries_record(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::Object(object) => object
            .keys()
            .any(|key| !ENVELOPE_KEYS.contains(&key.as_str())),
        _ => true,
    }
}
