use std::net::SocketAddr;
use log::info;
use tokio::sync::watch;
use crate::error::{Error, Result};

pub mod api;

pub use api::{routes, ApiState};

/// Serves the HTTP API until `shutdown` flips to `true` or its sender is dropped.
pub async fn serve(addr: SocketAddr, state: ApiState, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let signal = async move {
        loop {
            if *shutdown.borrow() {
                break;
            }
            if shutdown.changed().await.is_err() {
                break;
            }
        }
    };

    let (bound, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(addr, signal)
        .map_err(|e| Error::InternalError(format!("failed to bind {}: {}", addr, e)))?;
    info!("HTTP server listening on {}", bound);
    server.await;
    info!("HTTP server stopped");
    Ok(())
}
