//! Integration test common infrastructure.
//!
//! Provides utilities for spawning bridge servers inside the test runtime
//! and talking to them over real HTTP.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use gantry::{Client, Executor, ModuleCatalog, Server, ServerContext};

pub struct TestServer {
    ctx: Arc<ServerContext>,
    port: u16,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Spawn a direct-mode server on `port` and wait until it accepts.
    pub async fn spawn(port: u16, catalog: ModuleCatalog) -> anyhow::Result<Self> {
        Self::start(Server::new(port, catalog)).await
    }

    /// Spawn an executor-mode server. The returned [`Executor`] must be
    /// driven by the test on whatever thread plays the designated one.
    pub async fn spawn_executor(
        port: u16,
        catalog: ModuleCatalog,
        timeout: Duration,
    ) -> anyhow::Result<(Self, Executor)> {
        let server = Server::new(port, catalog);
        let executor = server.install_executor(timeout);
        let test_server = Self::start(server).await?;
        Ok((test_server, executor))
    }

    async fn start(server: Server) -> anyhow::Result<Self> {
        let port = server.port();
        let ctx = Arc::clone(server.context());
        let task = tokio::spawn(async move {
            if let Err(err) = server.run().await {
                eprintln!("test server exited with error: {err}");
            }
        });

        for _ in 0..100 {
            if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                return Ok(Self { ctx, port, task });
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        anyhow::bail!("test server on port {port} never came up")
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client(&self) -> Client {
        let mut client = Client::new(self.port);
        client.set_timeout(Duration::from_secs(2));
        client
    }

    /// Wait for the accept loop to exit after a shutdown.
    pub async fn join(self) -> anyhow::Result<()> {
        tokio::time::timeout(Duration::from_secs(2), self.task).await??;
        Ok(())
    }
}
