//! Built-in `core` module, always registered.

use std::sync::Arc;

use serde_json::Value;

use crate::registry::Command;

use super::{FnModuleSource, ModuleSource};

/// Name the built-in module registers under.
pub const NAME: &str = "core";

/// Commands every running server exposes.
pub fn commands() -> Vec<Command> {
    vec![
        // Being able to call this at all means the server is up.
        Command::from_fn("is_online", &[], |_| Ok(Value::Bool(true))),
        Command::from_fn("echo_message", &["message"], |params| {
            let message = params.get("message").cloned().unwrap_or(Value::Null);
            tracing::info!(message = %message, "echo");
            Ok(message)
        }),
    ]
}

/// Catalog entry for the built-in module, so `reload-modules` and an
/// explicit hotload of "core" behave like any other module.
pub fn source() -> Arc<dyn ModuleSource> {
    Arc::new(FnModuleSource::new(NAME, || Ok(commands())))
}
