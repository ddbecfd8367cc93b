//! Command dispatch: map an untyped inbound request onto a callable and
//! package the outcome into a response envelope.
//!
//! Administrative commands are checked first and handled against server
//! state directly — they are reserved names, never shadowable by loaded
//! modules, and never routed through the executor since they only touch
//! server-internal state. Everything else resolves through the registry,
//! validates argument names, and is invoked either inline (direct mode) or
//! via the cross-thread executor.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use gantry_proto::{admin, Envelope, Request, MODULE_KEY};

use crate::error::DispatchError;
use crate::hook::Event;
use crate::server::ServerContext;

/// Resolves, validates, and invokes commands. Produces exactly one envelope
/// per request; no failure is allowed past this boundary.
pub struct Dispatcher {
    ctx: Arc<ServerContext>,
    /// One inbound request fully resolves, including its executor
    /// round-trip, before the next is dispatched. No pipelining, no
    /// response reordering.
    serial: Mutex<()>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<ServerContext>) -> Self {
        Self {
            ctx,
            serial: Mutex::new(()),
        }
    }

    /// Decode and dispatch a raw JSON body. Malformed input becomes a
    /// failure envelope; it never raises past this boundary.
    pub async fn handle_raw(&self, raw: &[u8]) -> Envelope {
        match Request::from_slice(raw) {
            Ok(request) => self.handle(request).await,
            Err(err) => {
                let err = DispatchError::Parse(err.to_string());
                warn!(code = err.error_code(), error = %err, "rejected request body");
                Envelope::failure("", err.to_string())
            }
        }
    }

    /// Dispatch a decoded request.
    pub async fn handle(&self, mut request: Request) -> Envelope {
        let _serial = self.serial.lock().await;
        let command = request.command.clone();

        let outcome = if admin::is_reserved(&command) {
            self.handle_admin(&command, &request.parameters)
        } else {
            let hint = request.take_module_hint();
            self.invoke(&command, &request.parameters, hint.as_deref())
                .await
        };

        let success = outcome.is_ok();
        self.ctx
            .hook()
            .fire(&Event::command(&command, request.parameters, success));

        match outcome {
            Ok(value) => {
                debug!(command = %command, "command succeeded");
                Envelope::success(command, value)
            }
            Err(err) => {
                warn!(command = %command, code = err.error_code(), error = %err, "command failed");
                Envelope::failure(command, err.to_string())
            }
        }
    }

    /// Administrative commands, handled against server state directly.
    fn handle_admin(
        &self,
        name: &str,
        params: &Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        match name {
            admin::SHUTDOWN => {
                self.ctx.request_shutdown();
                Ok(json!("server offline"))
            }
            admin::LIST_COMMANDS => Ok(json!(self.ctx.registry().read().list_names())),
            admin::RELOAD_MODULES => {
                let (reloaded, failed) = self.ctx.reload_all();
                let failed: Map<String, Value> =
                    failed.into_iter().map(|(m, e)| (m, json!(e))).collect();
                Ok(json!({ "reloaded": reloaded, "failed": failed }))
            }
            admin::HOTLOAD_MODULE => {
                let modules = names_param(name, params, "modules")?;
                let external = params
                    .get("external")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);

                let mut loaded = Vec::new();
                let mut failed = Map::new();
                for module in modules {
                    match self.ctx.load_module(&module, external) {
                        Ok(()) => loaded.push(module),
                        Err(err) => {
                            failed.insert(module, json!(err.to_string()));
                        }
                    }
                }
                Ok(json!({ "loaded": loaded, "failed": failed }))
            }
            admin::UNLOAD_MODULE => {
                let modules = names_param(name, params, "modules")?;
                for module in &modules {
                    self.ctx.unload_module(module);
                }
                Ok(json!(self.ctx.registry().read().module_names()))
            }
            admin::DESCRIBE_COMMAND => {
                let target = params.get("command").and_then(Value::as_str).ok_or_else(|| {
                    DispatchError::MissingArgument {
                        command: name.to_string(),
                        missing: vec!["command".to_string()],
                    }
                })?;
                let hint = params.get(MODULE_KEY).and_then(Value::as_str);
                self.ctx
                    .registry()
                    .read()
                    .describe(target, hint)
                    .ok_or_else(|| DispatchError::CommandNotFound(target.to_string()))
            }
            // Guarded by admin::is_reserved; kept total for safety.
            _ => Err(DispatchError::CommandNotFound(name.to_string())),
        }
    }

    /// Resolve, validate, and invoke a module command.
    async fn invoke(
        &self,
        name: &str,
        params: &Map<String, Value>,
        module_hint: Option<&str>,
    ) -> Result<Value, DispatchError> {
        let command = self
            .ctx
            .registry()
            .read()
            .resolve(name, module_hint)
            .cloned()
            .ok_or_else(|| DispatchError::CommandNotFound(name.to_string()))?;

        let missing = command.missing_args(params);
        if !missing.is_empty() {
            return Err(DispatchError::MissingArgument {
                command: name.to_string(),
                missing,
            });
        }

        match self.ctx.executor() {
            Some(executor) => executor.submit(command, params.clone()).await,
            // Direct mode: invoke on the listener thread. A slow command
            // blocks the next request; acceptable for hosts that are safe to
            // mutate from any thread.
            None => command
                .invoke(params)
                .map_err(|err| DispatchError::Invocation(err.to_string())),
        }
    }
}

/// Read a parameter naming one or more modules; a bare string is treated as
/// a single-element batch. Anything that is not a string or an array of
/// strings is rejected, never silently dropped.
fn names_param(
    command: &str,
    params: &Map<String, Value>,
    key: &str,
) -> Result<Vec<String>, DispatchError> {
    let invalid = |reason: String| DispatchError::InvalidArgument {
        command: command.to_string(),
        argument: key.to_string(),
        reason,
    };
    match params.get(key) {
        Some(Value::String(one)) => Ok(vec![one.clone()]),
        Some(Value::Array(many)) => many
            .iter()
            .map(|entry| match entry {
                Value::String(name) => Ok(name.clone()),
                other => Err(invalid(format!("expected a string, got {other}"))),
            })
            .collect(),
        Some(other) => Err(invalid(format!(
            "expected a string or array of strings, got {other}"
        ))),
        None => Err(DispatchError::MissingArgument {
            command: command.to_string(),
            missing: vec![key.to_string()],
        }),
    }
}
