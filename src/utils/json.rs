//! Helpers for turning provider JSON into [`Record`]s.

use serde_json::Value;

use crate::models::Record;
use crate::sources::ClientError;

/// Clone the value at a JSON pointer, or `null` when absent
pub fn pick(value: &Value, pointer: &str) -> Value {
    value.pointer(pointer).cloned().unwrap_or(Value::Null)
}

/// The string at a JSON pointer
pub fn pick_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Apply `f` to each element of the array at `pointer`; missing arrays give `[]`
pub fn map_array(value: &Value, pointer: &str, f: impl Fn(&Value) -> Value) -> Value {
    Value::Array(
        value
            .pointer(pointer)
            .and_then(Value::as_array)
            .map(|items| items.iter().map(f).collect())
            .unwrap_or_default(),
    )
}

/// Unwrap a JSON object into a record
pub fn into_record(value: Value) -> Result<Record, ClientError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ClientError::Parse(format!(
            "expected a JSON object, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
