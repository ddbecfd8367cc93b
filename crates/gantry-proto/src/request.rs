//! The decoded inbound call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::MODULE_KEY;

/// A command invocation as received from the transport.
///
/// `parameters` is keyword-only: keys must match the target command's
/// argument names. The optional module hint travels inside `parameters`
/// under [`MODULE_KEY`](crate::MODULE_KEY), not as a top-level field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Request {
    pub fn new(command: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            command: command.into(),
            parameters,
        }
    }

    /// Decode a request from a raw JSON body.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Remove and return the reserved module hint, leaving only real
    /// arguments behind. A non-string value under the reserved key is
    /// discarded rather than treated as a hint.
    pub fn take_module_hint(&mut self) -> Option<String> {
        match self.parameters.remove(MODULE_KEY) {
            Some(Value::String(module)) => Some(module),
            _ => None,
        }
    }
}
