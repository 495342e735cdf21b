//! Chat message fixtures
//!
//! Message fixtures exist in two shapes. The current shape is
//! `{ "role": "...", "parts": [...] }`. The legacy shape is
//! `{ "role": "...", "content": "...", "toolInvocations": [...] }` and is
//! converted to parts: a text part for non-empty content, then one
//! tool-invocation part per entry, in order.

use serde_json::Value;
use testworld_store::MessagePart;

/// Errors while reading a message fixture
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// Fixture is not JSON
    #[error("invalid JSON: {0}")]
    Json(String),

    /// Top level is neither an array nor an object with a `messages` array
    #[error("expected an array of messages")]
    NotAnArray,

    /// One message is malformed
    #[error("message {index}: {reason}")]
    Invalid { index: usize, reason: String },
}

/// Message in the current parts-based shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureMessage {
    pub role: String,
    pub parts: Vec<MessagePart>,
}

impl FixtureMessage {
    /// Concatenated text parts
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::ToolInvocation { .. } => None,
            })
            .collect()
    }
}

/// Convert one message value, legacy or current, to the parts shape
///
/// # Errors
/// Returns a reason string when `role` is missing, `parts` is malformed, or
/// legacy fields have the wrong types.
pub fn normalize_message(value: &Value) -> Result<FixtureMessage, String> {
    let obj = value.as_object().ok_or("message is not an object")?;
    let role = obj
        .get("role")
        .and_then(Value::as_str)
        .ok_or("missing string 'role'")?
        .to_string();

    if let Some(parts) = obj.get("parts") {
        let parts: Vec<MessagePart> =
            serde_json::from_value(parts.clone()).map_err(|e| format!("invalid 'parts': {e}"))?;
        return Ok(FixtureMessage { role, parts });
    }

    let mut parts = Vec::new();
    match obj.get("content") {
        None | Some(Value::Null) => {}
        Some(Value::String(text)) if text.is_empty() => {}
        Some(Value::String(text)) => parts.push(MessagePart::Text { text: text.clone() }),
        Some(_) => return Err("legacy 'content' must be a string".to_string()),
    }
    match obj.get("toolInvocations") {
        None | Some(Value::Null) => {}
        Some(Value::Array(calls)) => parts.extend(calls.iter().map(|call| {
            MessagePart::ToolInvocation {
                tool_invocation: call.clone(),
            }
        })),
        Some(_) => return Err("legacy 'toolInvocations' must be an array".to_string()),
    }
    Ok(FixtureMessage { role, parts })
}

/// Parse a message fixture file
///
/// Accepts a top-level array or an object with a `messages` array.
///
/// # Errors
/// - `MessageError::Json` if the text is not JSON
/// - `MessageError::NotAnArray` on an unexpected top-level shape
/// - `MessageError::Invalid` for the first malformed message
pub fn parse_message_fixture(text: &str) -> Result<Vec<FixtureMessage>, MessageError> {
    let value: Value = serde_json::from_str(text).map_err(|e| MessageError::Json(e.to_string()))?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("messages")
            .and_then(Value::as_array)
            .ok_or(MessageError::NotAnArray)?,
        _ => return Err(MessageError::NotAnArray),
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            normalize_message(item).map_err(|reason| MessageError::Invalid { index, reason })
        })
        .collect()
}
