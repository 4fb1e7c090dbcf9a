//! Shared application state for the view server.
//!
//! [`AppState`] holds the broadcast channel for view frames and an
//! in-memory [`TrackingSnapshot`] that the REST endpoints serve. The live
//! loop writes the snapshot; the server only reads it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use colitrack_geo::ViewportController;
use colitrack_types::{MapEntity, ViewFrame};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for view frames.
///
/// A subscriber that falls behind by more than this many frames receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest one.
const BROADCAST_CAPACITY: usize = 256;

/// What the render surface currently shows.
#[derive(Debug, Clone, Default)]
pub struct TrackingSnapshot {
    /// Latest frame of the active session. `None` when nothing is tracked.
    pub frame: Option<ViewFrame>,
    /// Last fetched agencies and parcels, unfiltered.
    pub entities: Vec<MapEntity>,
    /// When `entities` was last replaced.
    pub entities_updated_at: Option<DateTime<Utc>>,
    /// Frames published since startup.
    pub frames_published: u64,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast sender for view frames.
    pub tx: broadcast::Sender<ViewFrame>,
    /// The current snapshot.
    pub snapshot: Arc<RwLock<TrackingSnapshot>>,
    /// Controller used to fit the entity layer viewport.
    pub controller: ViewportController,
}

impl AppState {
    /// Create state with an empty snapshot.
    pub fn new(controller: ViewportController) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(TrackingSnapshot::default())),
            controller,
        }
    }

    /// Subscribe to the frame broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewFrame> {
        self.tx.subscribe()
    }

    /// Store `frame` as the current one and push it to connected clients.
    ///
    /// Returns the number of clients that received it; 0 is not an error.
    pub async fn publish_frame(&self, frame: ViewFrame) -> usize {
        {
            let mut snapshot = self.snapshot.write().await;
            snapshot.frame = Some(frame.clone());
            snapshot.frames_published = snapshot.frames_published.saturating_add(1);
        }
        // send fails only when no WebSocket client is connected.
        self.tx.send(frame).unwrap_or(0)
    }

    /// Forget the current frame after tracking stops.
    pub async fn clear_frame(&self) {
        self.snapshot.write().await.frame = None;
    }

    /// Replace the entity collection.
    pub async fn set_entities(&self, entities: Vec<MapEntity>) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.entities = entities;
        snapshot.entities_updated_at = Some(Utc::now());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colitrack_geo::ViewportConfig;
    use colitrack_types::EntityKind;

    use super::*;

    fn state() -> AppState {
        AppState::new(ViewportController::new(ViewportConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn entities_are_replaced() {
        let state = state();
        let entity = MapEntity {
            id: "a1".to_owned(),
            kind: EntityKind::Agency,
            code: None,
            label: "Agence Akwa".to_owned(),
            point: None,
            status: None,
        };
        state.set_entities(vec![entity.clone(), entity]).await;
        state.set_entities(Vec::new()).await;
        let snapshot = state.snapshot.read().await;
        assert!(snapshot.entities.is_empty());
        assert!(snapshot.entities_updated_at.is_some());
    }

    #[tokio::test]
    async fn clear_without_frame_is_harmless() {
        let state = state();
        state.clear_frame().await;
        assert!(state.snapshot.read().await.frame.is_none());
    }
}
