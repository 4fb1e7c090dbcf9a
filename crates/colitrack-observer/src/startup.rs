//! Background startup helper for the live binary.
//!
//! [`spawn_observer`] binds eagerly, so a taken port fails at startup, then
//! serves on a background Tokio task alongside the live loop.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError, bind, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the view server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A running view server.
#[derive(Debug)]
pub struct ObserverHandle {
    /// Address actually bound.
    pub addr: SocketAddr,
    /// The serving task. Abort it to stop the server.
    pub task: JoinHandle<()>,
}

/// Bind `config` and serve `state` on a background task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the listener cannot bind.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<ObserverHandle, StartupError> {
    let listener = bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let task = tokio::spawn(async move {
        if let Err(e) = serve(listener, state).await {
            tracing::error!(error = %e, "view server exited with error");
        }
    });

    tracing::info!(%addr, "view server spawned on background task");

    Ok(ObserverHandle { addr, task })
}
