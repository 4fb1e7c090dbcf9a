//! View server for the Colitrack render surface.
//!
//! Exposes the live tracking view over HTTP and `WebSocket`:
//!
//! - **`WebSocket` endpoint** (`/ws/track`) streaming every
//!   [`ViewFrame`](colitrack_types::ViewFrame) through a
//!   [`tokio::sync::broadcast`] channel
//! - **REST endpoints** for the current frame, the filtered
//!   agencies/parcels layer and a health probe
//! - **Minimal HTML page** (`GET /`) with the tracked code and links
//!
//! The live loop writes into [`TrackingSnapshot`]; handlers only read it.
//!
//! [`TrackingSnapshot`]: state::TrackingSnapshot

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{ObserverHandle, StartupError, spawn_observer};
pub use state::{AppState, TrackingSnapshot};
