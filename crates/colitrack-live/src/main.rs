//! Live tracking binary for Colitrack.
//!
//! Wires the position channel, the REST client, the tracking core and the
//! view server together on a single-threaded runtime.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `colitrack-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the viewport controller and REST client
//! 4. Connect to NATS (in-process fallback when unreachable)
//! 5. Start the view server
//! 6. Read commands from stdin and run the live loop
//!
//! Tracking codes given as arguments are tracked straight away; the last
//! one wins.

mod command;
mod error;
mod live;

use std::sync::Arc;
use std::time::Duration;

use colitrack_api::ApiClient;
use colitrack_channel::{ChannelClient, MemoryHub, Transport};
use colitrack_core::ColitrackConfig;
use colitrack_geo::ViewportController;
use colitrack_observer::{AppState, ServerConfig};
use colitrack_types::ConnectionState;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::{Command, initial_code, read_commands};
use crate::error::LiveError;
use crate::live::{LiveLoop, LiveSettings};

/// Capacity of the operator command queue.
const COMMAND_BUFFER: usize = 16;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config = ColitrackConfig::load().map_err(LiveError::from)?;

    // 2. Initialize structured logging.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!(
        api = config.api.base_url,
        nats = config.channel.nats_url,
        observer_port = config.observer.port,
        "colitrack-live starting"
    );

    // 3. Viewport controller and REST client.
    let controller = ViewportController::new(config.viewport.clone()).map_err(LiveError::from)?;
    let api = ApiClient::new(
        &config.api.base_url,
        config.api.token.clone(),
        Duration::from_millis(config.api.request_timeout_ms),
    )
    .map_err(LiveError::from)?;
    if config.api.token.is_none() {
        warn!("no API token configured, backend calls will likely be rejected");
    }

    // 4. Position channel.
    let transport = match Transport::nats(&config.channel.nats_url).await {
        Ok(transport) => {
            info!(url = config.channel.nats_url, "NATS connected");
            transport
        }
        Err(e) => {
            warn!(error = %e, "NATS unavailable, live positions disabled");
            let hub = MemoryHub::default();
            hub.set_connection(ConnectionState::Disconnected);
            Transport::Memory(hub)
        }
    };
    let channel = ChannelClient::new(
        transport,
        config.channel.subject_prefix.clone(),
        config.channel.buffer,
    );

    // 5. View server.
    let observer = Arc::new(AppState::new(controller.clone()));
    let server = ServerConfig {
        host: config.observer.host.clone(),
        port: config.observer.port,
    };
    let handle = colitrack_observer::spawn_observer(&server, Arc::clone(&observer))
        .await
        .map_err(LiveError::from)?;
    info!(addr = %handle.addr, "view server started");

    // 6. Commands and the live loop.
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    if let Some(code) = initial_code(std::env::args().skip(1)) {
        tx.send(Command::Track(code)).await?;
    }
    tokio::spawn(read_commands(BufReader::new(tokio::io::stdin()), tx.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = tx.send(Command::Quit).await;
        }
    });

    let settings = LiveSettings {
        stale_after: Duration::from_millis(config.channel.stale_after_ms),
        reconcile: config.reconcile,
        per_page: config.api.per_page,
    };
    let result = LiveLoop::new(api, channel, observer, controller, settings)
        .run(rx)
        .await;

    handle.task.abort();
    result?;
    info!("colitrack-live shutdown complete");
    Ok(())
}
