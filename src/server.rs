//! Server state and lifecycle.
//!
//! [`ServerContext`] is the process-scoped context shared by the listener,
//! the dispatcher, and the executor: the running flag, the registry, the
//! module catalog, the event hub, and the optional executor handle. It is
//! passed around as an `Arc` rather than living in globals.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{error, info};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::executor::{Executor, ExecutorHandle};
use crate::hook::{Event, EventHub};
use crate::http;
use crate::modules::{self, ModuleCatalog, ModuleSource};
use crate::registry::Registry;

/// Record of a module currently loaded into the registry, kept so
/// `reload-modules` can re-run every load.
#[derive(Debug, Clone)]
struct LoadedModule {
    name: String,
    external: bool,
}

/// Shared server state.
pub struct ServerContext {
    /// Flips to false exactly once; terminal, no restart.
    running: AtomicBool,
    registry: RwLock<Registry>,
    catalog: RwLock<ModuleCatalog>,
    loaded: RwLock<Vec<LoadedModule>>,
    hook: EventHub,
    executor: RwLock<Option<ExecutorHandle>>,
    shutdown: Notify,
}

impl ServerContext {
    /// Build the context and load the built-in `core` module.
    pub fn new(mut catalog: ModuleCatalog) -> Self {
        catalog.insert(modules::core::source());
        let ctx = Self {
            running: AtomicBool::new(true),
            registry: RwLock::new(Registry::new()),
            catalog: RwLock::new(catalog),
            loaded: RwLock::new(Vec::new()),
            hook: EventHub::new(),
            executor: RwLock::new(None),
            shutdown: Notify::new(),
        };
        // The built-in source is infallible; a failure here is a logic error.
        if let Err(err) = ctx.load_module(modules::core::NAME, false) {
            error!(error = %err, "failed to load built-in core module");
        }
        ctx
    }

    /// Whether the listener should keep accepting requests.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flip the running flag false and wake the accept loop. Idempotent:
    /// requesting shutdown when already stopped is a no-op.
    pub fn request_shutdown(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("shutdown requested");
            self.hook.fire(&Event::terminated());
            // Drop the submit side so an executor run loop can exit.
            *self.executor.write() = None;
            self.shutdown.notify_one();
        }
    }

    /// Resolves once shutdown has been requested. `notify_one` stores a
    /// permit, so this completes even if the request happened first.
    pub async fn shutdown_signal(&self) {
        self.shutdown.notified().await;
    }

    pub fn registry(&self) -> &RwLock<Registry> {
        &self.registry
    }

    pub fn hook(&self) -> &EventHub {
        &self.hook
    }

    /// Make a module source available for hotloading.
    pub fn register_source(&self, source: Arc<dyn ModuleSource>) {
        self.catalog.write().insert(source);
    }

    pub fn executor(&self) -> Option<ExecutorHandle> {
        self.executor.read().clone()
    }

    /// Register the executor's submit side. Must happen before the listener
    /// starts routing commands through it.
    pub fn set_executor(&self, handle: ExecutorHandle) {
        *self.executor.write() = Some(handle);
    }

    /// Load (or hotload) a module by identifier: run its source and register
    /// every yielded command, overwriting same-named ones.
    pub fn load_module(&self, name: &str, external: bool) -> Result<(), DispatchError> {
        let source = self.catalog.read().get(name).ok_or_else(|| {
            DispatchError::ModuleLoad {
                module: name.to_string(),
                reason: "no such module source".to_string(),
            }
        })?;
        let commands = source.load().map_err(|err| DispatchError::ModuleLoad {
            module: name.to_string(),
            reason: err.to_string(),
        })?;

        self.registry.write().register_module(name, external, commands);

        let mut loaded = self.loaded.write();
        if !loaded.iter().any(|m| m.name == name) {
            loaded.push(LoadedModule {
                name: name.to_string(),
                external,
            });
        }
        info!(module = %name, external, "module loaded");
        Ok(())
    }

    /// Remove a module's commands. Unknown names are ignored.
    pub fn unload_module(&self, name: &str) {
        self.registry.write().unregister_module(name);
        self.loaded.write().retain(|m| m.name != name);
        info!(module = %name, "module unloaded");
    }

    /// Re-run the load step for every tracked module, dropping then
    /// re-registering its commands. One module's failure does not abort the
    /// rest; a failed module stays tracked so a later reload can retry it.
    pub fn reload_all(&self) -> (Vec<String>, Vec<(String, String)>) {
        let snapshot: Vec<LoadedModule> = self.loaded.read().clone();
        let mut reloaded = Vec::new();
        let mut failed = Vec::new();

        for module in snapshot {
            self.registry.write().unregister_module(&module.name);
            match self.load_module(&module.name, module.external) {
                Ok(()) => reloaded.push(module.name),
                Err(err) => {
                    error!(module = %module.name, error = %err, "module reload failed");
                    failed.push((module.name, err.to_string()));
                }
            }
        }
        (reloaded, failed)
    }
}

/// The embedded bridge server: shared context, dispatcher, and bound port.
pub struct Server {
    ctx: Arc<ServerContext>,
    dispatcher: Arc<Dispatcher>,
    port: u16,
}

impl Server {
    pub fn new(port: u16, catalog: ModuleCatalog) -> Self {
        let ctx = Arc::new(ServerContext::new(catalog));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&ctx)));
        Self {
            ctx,
            dispatcher,
            port,
        }
    }

    /// Build from configuration, preloading the configured modules. A module
    /// that fails to preload is logged and skipped, not fatal.
    pub fn from_config(config: &Config, catalog: ModuleCatalog) -> Self {
        let server = Self::new(config.port(), catalog);
        for module in &config.server.modules {
            if let Err(err) = server.ctx.load_module(module, false) {
                error!(module = %module, error = %err, "failed to preload module");
            }
        }
        server
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Create the executor pair and register its submit side. The returned
    /// [`Executor`] must be run on the host's designated thread; call this
    /// before [`run`](Self::run) so no command slips past the executor.
    pub fn install_executor(&self, timeout: Duration) -> Executor {
        let (executor, handle) = Executor::new(timeout);
        self.ctx.set_executor(handle);
        executor
    }

    /// Serve requests until shutdown is requested.
    pub async fn run(&self) -> anyhow::Result<()> {
        http::serve(self.port, Arc::clone(&self.dispatcher), Arc::clone(&self.ctx)).await
    }
}

/// Start a server on a background thread with its own runtime. Use this from
/// host programs that are safe to mutate from any thread.
pub fn spawn_server(server: Server) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!(error = %err, "failed to build server runtime");
                return;
            }
        };
        if let Err(err) = runtime.block_on(server.run()) {
            error!(error = %err, "server exited with error");
        }
    })
}

/// Start a server on a background thread and return the executor the host
/// must drive on its designated thread. Use this for hosts that crash when
/// mutated off the main thread.
pub fn spawn_executor_server(
    server: Server,
    timeout: Duration,
) -> (Executor, thread::JoinHandle<()>) {
    let executor = server.install_executor(timeout);
    let handle = spawn_server(server);
    (executor, handle)
}

/// Probe whether something already listens on `port` at localhost. Useful
/// before trying to start a server on a host program's well-known port.
pub fn port_in_use(port: u16) -> bool {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(125)).is_ok()
}
