//! REST endpoint handlers for the view server.
//!
//! All handlers read from the in-memory [`TrackingSnapshot`] via the shared
//! [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/frame` | Current view frame |
//! | `GET` | `/api/entities` | Filtered agencies/parcels layer |
//! | `GET` | `/api/health` | Liveness and counters |
//!
//! [`TrackingSnapshot`]: crate::state::TrackingSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use colitrack_geo::build_entity_layer;
use colitrack_types::{FilterState, StatusFilter};

use crate::error::ObserverError;
use crate::state::AppState;

/// Query parameters for the `GET /api/entities` endpoint.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EntitiesQuery {
    /// Free-text search token.
    pub search: Option<String>,
    /// Status selector (`all`, a status key or a backend label).
    pub status: Option<String>,
}

impl EntitiesQuery {
    /// Convert into a [`FilterState`].
    ///
    /// # Errors
    ///
    /// Returns [`ObserverError::InvalidQuery`] for an unknown status.
    pub fn to_filter(&self) -> Result<FilterState, ObserverError> {
        let status = match self.status.as_deref() {
            None => StatusFilter::All,
            Some(raw) => StatusFilter::parse(raw)
                .ok_or_else(|| ObserverError::InvalidQuery(format!("unknown status {raw:?}")))?,
        };
        Ok(FilterState::new(
            self.search.clone().unwrap_or_default(),
            status,
        ))
    }
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page with the tracked code and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let (code, status, points) = snapshot.frame.as_ref().map_or_else(
        || (String::from("none"), String::from("-"), 0),
        |f| (f.code.to_string(), f.status.as_str().to_owned(), f.route.len()),
    );
    let entity_count = snapshot.entities.len();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Colitrack</title>
    <style>
        body {{ font-family: sans-serif; padding: 2rem; max-width: 720px; margin: 0 auto; }}
        td {{ padding: 0.2rem 1rem 0.2rem 0; }}
    </style>
</head>
<body>
    <h1>Colitrack</h1>
    <table>
        <tr><td>Tracking</td><td>{code}</td></tr>
        <tr><td>Status</td><td>{status}</td></tr>
        <tr><td>Route points</td><td>{points}</td></tr>
        <tr><td>Entities</td><td>{entity_count}</td></tr>
    </table>
    <ul>
        <li><a href="/api/frame">/api/frame</a></li>
        <li><a href="/api/entities">/api/entities</a></li>
        <li><a href="/api/health">/api/health</a></li>
        <li><code>/ws/track</code> (WebSocket)</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/frame
// ---------------------------------------------------------------------------

/// Return the current view frame, or 404 when nothing is tracked.
pub async fn get_frame(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let frame = snapshot
        .frame
        .as_ref()
        .ok_or_else(|| ObserverError::NotFound(String::from("no shipment tracked")))?;
    Ok(Json(serde_json::to_value(frame)?))
}

// ---------------------------------------------------------------------------
// GET /api/entities
// ---------------------------------------------------------------------------

/// Return the agencies/parcels layer filtered by `search` and `status`.
pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EntitiesQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let filter = params.to_filter()?;
    let snapshot = state.snapshot.read().await;
    let layer = build_entity_layer(
        &snapshot.entities,
        &filter,
        &state.controller,
        &state.controller.home_viewport(),
    );
    Ok(Json(serde_json::to_value(&layer)?))
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

/// Liveness probe with a few counters.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(serde_json::json!({
        "status": "ok",
        "tracking": snapshot.frame.as_ref().map(|f| f.code.to_string()),
        "signal": snapshot.frame.as_ref().map(|f| f.signal),
        "entities": snapshot.entities.len(),
        "entities_updated_at": snapshot.entities_updated_at,
        "frames_published": snapshot.frames_published,
        "clients": state.tx.receiver_count(),
    }))
}
