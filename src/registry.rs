//! Command registry: the mapping from module and command names to callables.
//!
//! Commands are stored as a uniform invokable abstraction — a name, the list
//! of required argument names, and a boxed call operation — so any closure or
//! function can be wrapped without the dispatcher knowing its concrete type.
//! Registration order is significant: unhinted resolution scans modules in
//! the order they were registered and returns the first name match.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::InvokeError;

/// Boxed call operation backing a registered command.
pub type CommandFn =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Value, InvokeError> + Send + Sync>;

/// A named invokable unit plus the metadata needed to validate and describe
/// it without invoking it. Immutable once registered; identity is
/// (module name, command name).
#[derive(Clone)]
pub struct Command {
    name: String,
    required_args: Vec<String>,
    /// Name of a catch-all container accepting arbitrary extra keys, if any.
    catch_all: Option<String>,
    func: CommandFn,
}

impl Command {
    pub fn new(name: impl Into<String>, required_args: Vec<String>, func: CommandFn) -> Self {
        Self {
            name: name.into(),
            required_args,
            catch_all: None,
            func,
        }
    }

    /// Build a command from a closure and its required argument names.
    pub fn from_fn<F>(name: &str, required_args: &[&str], func: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        Self::new(
            name,
            required_args.iter().map(|a| a.to_string()).collect(),
            Arc::new(func),
        )
    }

    /// Declare a catch-all container that soaks up extra keyword arguments.
    pub fn with_catch_all(mut self, container: impl Into<String>) -> Self {
        self.catch_all = Some(container.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_args(&self) -> &[String] {
        &self.required_args
    }

    /// Invoke the underlying callable with keyword parameters.
    pub fn invoke(&self, parameters: &Map<String, Value>) -> Result<Value, InvokeError> {
        (self.func)(parameters)
    }

    /// Required argument names absent from `parameters`. Extra keys are
    /// tolerated and ignored here; the callable may still reject them.
    pub fn missing_args(&self, parameters: &Map<String, Value>) -> Vec<String> {
        self.required_args
            .iter()
            .filter(|arg| !parameters.contains_key(arg.as_str()))
            .cloned()
            .collect()
    }

    /// Introspect the call signature without invoking.
    pub fn describe(&self) -> Value {
        let mut desc = Map::new();
        desc.insert("command".into(), json!(self.name));
        desc.insert("arguments".into(), json!(self.required_args));
        if let Some(container) = &self.catch_all {
            desc.insert("packed_kwargs".into(), json!(format!("**{container}")));
        }
        Value::Object(desc)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("required_args", &self.required_args)
            .field("catch_all", &self.catch_all)
            .finish_non_exhaustive()
    }
}

/// A named, ordered group of commands sharing a lifecycle.
#[derive(Debug)]
pub struct Module {
    name: String,
    /// Loaded from outside the built-in set; addressed by its full identifier.
    external: bool,
    commands: Vec<Command>,
}

impl Module {
    fn new(name: impl Into<String>, external: bool) -> Self {
        Self {
            name: name.into(),
            external,
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Insert a command, overwriting a same-named one in place so that a
    /// hotload keeps the original position in listing order.
    fn insert(&mut self, command: Command) {
        match self.commands.iter_mut().find(|c| c.name == command.name) {
            Some(slot) => *slot = command,
            None => self.commands.push(command),
        }
    }

    fn get(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }
}

/// Module name → commands, in registration order.
#[derive(Debug, Default)]
pub struct Registry {
    modules: Vec<Module>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a command under `module_name`. Last write wins;
    /// overwriting is not an error — it is how hotloading updates
    /// functionality live.
    pub fn register(&mut self, module_name: &str, external: bool, command: Command) {
        if let Some(module) = self.modules.iter_mut().find(|m| m.name == module_name) {
            module.insert(command);
            return;
        }
        let mut module = Module::new(module_name, external);
        module.insert(command);
        self.modules.push(module);
    }

    /// Register a full batch of commands under one module.
    pub fn register_module(&mut self, module_name: &str, external: bool, commands: Vec<Command>) {
        for command in commands {
            self.register(module_name, external, command);
        }
    }

    /// Remove all commands under `module_name`. Unknown names are a no-op,
    /// not an error.
    pub fn unregister_module(&mut self, module_name: &str) {
        self.modules.retain(|m| m.name != module_name);
    }

    /// Look up a command by name. With a hint, only that module is searched;
    /// without one, modules are scanned in registration order and the first
    /// match wins. Cross-module name collisions are therefore resolved by
    /// load order — a documented limitation, not a guaranteed disambiguation.
    pub fn resolve(&self, name: &str, module_hint: Option<&str>) -> Option<&Command> {
        match module_hint {
            Some(hint) => self
                .modules
                .iter()
                .find(|m| m.name == hint)
                .and_then(|m| m.get(name)),
            None => self.modules.iter().find_map(|m| m.get(name)),
        }
    }

    /// All registered command names across all modules, in registration
    /// order, duplicates included.
    pub fn list_names(&self) -> Vec<String> {
        self.modules
            .iter()
            .flat_map(|m| m.commands.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// Introspect a command's signature without invoking it.
    pub fn describe(&self, name: &str, module_hint: Option<&str>) -> Option<Value> {
        self.resolve(name, module_hint).map(Command::describe)
    }

    /// Names of all registered modules, in registration order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }
}
