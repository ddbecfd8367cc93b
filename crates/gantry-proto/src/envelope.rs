//! The fixed-shape response returned for every request.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope.
///
/// Every code path in the server produces exactly one of these per request.
/// `Message` is only present on failure; `ReturnValue` is `null` when a
/// command returns nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Echo of the command name the request carried.
    #[serde(rename = "Command")]
    pub command: String,

    #[serde(rename = "Success")]
    pub success: bool,

    #[serde(rename = "ReturnValue")]
    pub return_value: Value,

    /// Human-readable wall-clock time the envelope was built.
    #[serde(rename = "Time")]
    pub time: String,

    /// Failure description. Absent on success.
    #[serde(rename = "Message", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    /// Build a success envelope carrying `return_value`.
    pub fn success(command: impl Into<String>, return_value: Value) -> Self {
        Self {
            command: command.into(),
            success: true,
            return_value,
            time: timestamp(),
            message: None,
        }
    }

    /// Build a failure envelope carrying `message`. The return value is null.
    pub fn failure(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            success: false,
            return_value: Value::Null,
            time: timestamp(),
            message: Some(message.into()),
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
