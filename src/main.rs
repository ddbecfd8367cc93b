//! gantryd - standalone bridge server.
//!
//! Runs the dispatch core outside any host application: direct mode by
//! default, or executor mode with the process main thread acting as the
//! designated thread when the config asks for it.

use gantry::{port_in_use, spawn_server, Config, ModuleCatalog, Server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration; with no argument, run on defaults
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).map_err(|e| {
            error!(path = %path, error = %e, "Failed to load config");
            e
        })?,
        None => {
            info!("No config given, using defaults");
            Config::default()
        }
    };

    let port = config.port();
    if port_in_use(port) {
        error!(port, "Port is already in use, can't start server");
        anyhow::bail!("port {port} is already in use");
    }

    let server = Server::from_config(&config, ModuleCatalog::new());
    info!(port, executor = config.executor.enabled, "Starting gantry");

    if config.executor.enabled {
        // The listener runs on a worker thread; this thread stands in for a
        // host main thread and drives the executor until shutdown.
        let executor = server.install_executor(config.executor_timeout());
        let listener = spawn_server(server);
        executor.run();
        if listener.join().is_err() {
            error!("listener thread panicked");
        }
        Ok(())
    } else {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(server.run())
    }
}
