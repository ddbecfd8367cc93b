//! HTTP client for talking to a bridge server from another process.

use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use gantry_proto::{ports, Envelope, Request};

/// Client-side errors. A failure envelope is not an error here — it is a
/// successful round-trip carrying `Success: false`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A connection to one bridge server.
pub struct Client {
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl Client {
    pub fn new(port: u16) -> Self {
        Self::with_address("127.0.0.1", port)
    }

    pub fn with_address(host: &str, port: u16) -> Self {
        Self {
            url: format!("http://{host}:{port}/"),
            timeout: Duration::from_secs(1),
            http: reqwest::Client::new(),
        }
    }

    /// Connect to the host program's well-known port.
    pub fn for_host_program(name: &str) -> Self {
        Self::new(ports::for_host_program(name))
    }

    /// Per-request timeout; commands marshalled to a busy host thread may
    /// need a larger value than the one-second default.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Execute a command on the server. `parameters` keys must match the
    /// command's argument names exactly.
    pub async fn execute(
        &self,
        command: &str,
        parameters: Map<String, Value>,
    ) -> Result<Envelope, ClientError> {
        let request = Request::new(command, parameters);
        let response = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;
        Ok(response.json::<Envelope>().await?)
    }

    /// Whether a server answers on the other end.
    pub async fn is_host_online(&self) -> bool {
        self.execute("is_online", Map::new())
            .await
            .map(|envelope| envelope.success)
            .unwrap_or(false)
    }
}

/// Re-parse a stringified return value into structured JSON.
///
/// Some host integrations can only ship rich values as their string form;
/// this undoes that on the client side. The core envelope carries native
/// JSON values and never needs this — it exists purely for those adapters,
/// and falls back to the raw value when the string is not valid JSON.
pub fn reparse_stringified(envelope: &Envelope) -> Value {
    match &envelope.return_value {
        Value::String(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| envelope.return_value.clone())
        }
        other => other.clone(),
    }
}
