//! Axum router construction for the view server.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/track` -- `WebSocket` view frame stream
/// - `GET /api/frame` -- current view frame
/// - `GET /api/entities` -- agencies/parcels layer
/// - `GET /api/health` -- liveness probe
///
/// CORS allows any origin so a map page served elsewhere can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/ws/track", get(ws::ws_track))
        .route("/api/frame", get(handlers::get_frame))
        .route("/api/entities", get(handlers::list_entities))
        .route("/api/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
