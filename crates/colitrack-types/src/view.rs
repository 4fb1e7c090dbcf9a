//! Render-surface payloads.
//!
//! These are the shapes pushed to the browser map: a [`ViewFrame`] per
//! tracking update and an [`EntityLayer`] for the agencies/parcels overview.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EntityKind, IconKey, ShipmentStatus, SignalState, TrackingPhase};
use crate::ids::{SessionId, TrackingCode};
use crate::structs::{GeoPoint, MapEntity, TrackingStep, ViewportState};

/// A positioned, styled marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Marker {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Icon to draw.
    pub icon: IconKey,
    /// CSS color for the marker and its popup accent.
    pub color: String,
    /// Popup text.
    pub label: Option<String>,
    /// Entity the marker belongs to, when drawn from an entity list.
    pub entity_id: Option<String>,
    /// Entity kind, when drawn from an entity list.
    pub kind: Option<EntityKind>,
}

/// Everything the live-tracking view needs to render one update.
///
/// The history panel and the route line are both derived from `timeline`,
/// so they never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ViewFrame {
    /// Session that produced the frame.
    pub session_id: SessionId,
    /// Tracked shipment.
    pub code: TrackingCode,
    /// Accumulator phase.
    pub phase: TrackingPhase,
    /// Current status.
    pub status: ShipmentStatus,
    /// Live-signal indicator.
    pub signal: SignalState,
    /// First known point.
    pub origin: Option<GeoPoint>,
    /// Plotted route, derived from the timeline.
    pub route: Vec<GeoPoint>,
    /// Merged history + live timeline.
    pub timeline: Vec<TrackingStep>,
    /// Styled markers for the route.
    pub markers: Vec<Marker>,
    /// Fitted viewport.
    pub viewport: ViewportState,
    /// Live events dropped for invalid coordinates.
    pub dropped_events: u64,
    /// When the frame was built.
    pub generated_at: DateTime<Utc>,
}

/// Agencies/parcels overview: list rows plus map markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityLayer {
    /// Filtered entities for the list view, including those without a valid
    /// position.
    pub rows: Vec<MapEntity>,
    /// Markers for the filtered entities that have a valid position.
    pub markers: Vec<Marker>,
    /// Viewport fitted to the markers.
    pub viewport: ViewportState,
}
