//! JSON-over-HTTP listener for the dispatch core.
//!
//! The transport is deliberately thin: decode the body, hand it to the
//! dispatcher, encode the envelope back. Replies are always HTTP 200 — the
//! success flag lives inside the envelope, not in the status code.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use gantry_proto::Envelope;

use crate::dispatch::Dispatcher;
use crate::server::ServerContext;

async fn dispatch_handler(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Json<Envelope> {
    Json(dispatcher.handle_raw(&body).await)
}

/// Serve the dispatcher on `127.0.0.1:port` until shutdown is requested.
///
/// The bridge binds loopback only; it remote-controls a local host
/// application, not the network.
pub async fn serve(
    port: u16,
    dispatcher: Arc<Dispatcher>,
    ctx: Arc<ServerContext>,
) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/", post(dispatch_handler))
        .with_state(dispatcher);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening for bridge requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ctx.shutdown_signal().await })
        .await?;

    tracing::info!("server shut down");
    Ok(())
}
