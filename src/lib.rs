//! gantry — an embeddable RPC bridge for remote-controlling host
//! applications.
//!
//! A server embedded inside a host application (a DCC tool, an engine
//! editor, anything with a scripting surface) exposes named, hot-swappable
//! commands over JSON-over-HTTP. A client elsewhere sends a command name
//! plus keyword arguments and gets a structured envelope back.
//!
//! The core is the dispatch pipeline: [`Dispatcher`] maps an untyped
//! request onto a [`registry::Command`], validates argument names, invokes
//! it — inline, or marshalled onto a designated host thread via
//! [`Executor`] — and packages every outcome into exactly one
//! [`proto::Envelope`]. Modules load, hotload, and unload live through the
//! [`modules::ModuleCatalog`], without restarting the server.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod hook;
pub mod http;
pub mod modules;
pub mod registry;
pub mod server;

pub use gantry_proto as proto;

pub use client::Client;
pub use config::Config;
pub use dispatch::Dispatcher;
pub use error::{DispatchError, InvokeError, ModuleError};
pub use executor::{Executor, ExecutorHandle};
pub use hook::{Event, EventHub, EventKind};
pub use modules::{FnModuleSource, ModuleCatalog, ModuleSource};
pub use registry::{Command, Registry};
pub use server::{port_in_use, spawn_executor_server, spawn_server, Server, ServerContext};
