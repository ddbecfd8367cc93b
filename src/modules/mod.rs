//! Module sources: loadable units that yield commands.
//!
//! A [`ModuleSource`] is the bridge's analog of an importable plugin: asked
//! to load, it produces a fresh batch of commands to register under its
//! name. Host integrations register their sources in a [`ModuleCatalog`] at
//! startup; the server then loads, hotloads, unloads, and reloads them by
//! identifier without restarting.

pub mod core;

use std::sync::Arc;

use crate::error::ModuleError;
use crate::registry::Command;

/// A loadable unit that yields (name, callable) pairs.
pub trait ModuleSource: Send + Sync {
    /// Identifier the module registers under. Internal sources use a short
    /// name; external ones use their fully-qualified identifier.
    fn name(&self) -> &str;

    /// Produce a fresh set of commands. Called on load, hotload, and reload,
    /// so a source that reads from disk or regenerates bindings picks up
    /// changes each time.
    fn load(&self) -> Result<Vec<Command>, ModuleError>;
}

/// A module source built from a name and a loader closure.
pub struct FnModuleSource {
    name: String,
    loader: Box<dyn Fn() -> Result<Vec<Command>, ModuleError> + Send + Sync>,
}

impl FnModuleSource {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Vec<Command>, ModuleError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
        }
    }
}

impl ModuleSource for FnModuleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<Command>, ModuleError> {
        (self.loader)()
    }
}

/// Catalog of the module sources available for (hot)loading.
#[derive(Default)]
pub struct ModuleCatalog {
    sources: Vec<Arc<dyn ModuleSource>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source, replacing any existing one with the same identifier.
    pub fn insert(&mut self, source: Arc<dyn ModuleSource>) {
        self.sources.retain(|s| s.name() != source.name());
        self.sources.push(source);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ModuleSource>> {
        self.sources.iter().find(|s| s.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }
}
