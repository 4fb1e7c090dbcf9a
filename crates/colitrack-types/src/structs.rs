//! Core entity structs: points, events, steps, shipments, map entities,
//! envelopes and viewport state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EntityKind, ShipmentStatus, StatusFilter, StepSource};
use crate::ids::TrackingCode;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Whether a latitude/longitude pair denotes a real, renderable position.
///
/// Both values must be finite and within WGS84 range, and the pair must not be
/// `(0, 0)`. The backend stores `(0, 0)` for "unknown location"; it is never
/// the equator/prime-meridian intersection.
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    if !lat.is_finite() || !lng.is_finite() {
        return false;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return false;
    }
    !(lat == 0.0 && lng == 0.0)
}

/// A geographic position with optional metadata.
///
/// Immutable once appended to a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lng: f64,
    /// When the position was observed, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Free-text location label (agency name, city).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Raw status label carried with the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl GeoPoint {
    /// A bare point without metadata.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            timestamp: None,
            label: None,
            status: None,
        }
    }

    /// Attach an observation time.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach a location label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach a status label.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// See [`is_valid_coordinate`].
    pub fn is_valid(&self) -> bool {
        is_valid_coordinate(self.lat, self.lng)
    }
}

/// A position/status event received on the live channel.
///
/// Coordinates are optional because the channel is not trusted: a payload
/// with missing or unparseable coordinates still decodes, and the path
/// accumulator drops it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PositionEvent {
    /// Latitude in decimal degrees.
    pub lat: Option<f64>,
    /// Longitude in decimal degrees.
    pub lng: Option<f64>,
    /// Optional status label (`in_transit`, `delivered`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Optional emission time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PositionEvent {
    /// An event at the given coordinates with no status.
    pub const fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            status: None,
            timestamp: None,
        }
    }

    /// Attach a status label.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Attach an emission time.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The point this event denotes, or `None` when the coordinates are
    /// missing or invalid.
    pub fn to_point(&self) -> Option<GeoPoint> {
        let (lat, lng) = (self.lat?, self.lng?);
        if !is_valid_coordinate(lat, lng) {
            return None;
        }
        Some(GeoPoint {
            lat,
            lng,
            timestamp: self.timestamp,
            label: None,
            status: self.status.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tracking history
// ---------------------------------------------------------------------------

/// One entry of a shipment's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrackingStep {
    /// When the step happened. Live points may lack it.
    pub timestamp: Option<DateTime<Utc>>,
    /// Raw status label as shown in the history panel.
    pub status: String,
    /// Location label.
    pub location: Option<String>,
    /// Position, when the step was geolocated.
    pub point: Option<GeoPoint>,
    /// Origin of the step.
    pub source: StepSource,
}

impl TrackingStep {
    /// The parsed status, if the label is a known one.
    pub fn status_kind(&self) -> Option<ShipmentStatus> {
        ShipmentStatus::parse_label(&self.status)
    }
}

/// A tracked shipment: code, current status, route and origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrackedShipment {
    /// External identifier.
    pub code: TrackingCode,
    /// Current status.
    pub status: ShipmentStatus,
    /// Raw label of the last status received, kept for display.
    pub status_label: Option<String>,
    /// Append-only route.
    pub route: Vec<GeoPoint>,
    /// First valid point. Set once.
    pub origin: Option<GeoPoint>,
}

impl TrackedShipment {
    /// A shipment with no route yet.
    pub const fn new(code: TrackingCode) -> Self {
        Self {
            code,
            status: ShipmentStatus::Registered,
            status_label: None,
            route: Vec::new(),
            origin: None,
        }
    }
}

// ---------------------------------------------------------------------------
// List-view entities
// ---------------------------------------------------------------------------

/// A courier agency as listed by `GET /agences`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Agency {
    /// Backend identifier.
    pub id: String,
    /// Agency name.
    pub name: String,
    /// City, if provided.
    pub city: Option<String>,
    /// Latitude, if geolocated.
    pub latitude: Option<f64>,
    /// Longitude, if geolocated.
    pub longitude: Option<f64>,
}

/// A parcel as listed by `GET /colis/{statusFilter}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Parcel {
    /// Backend identifier.
    pub id: String,
    /// External tracking code.
    pub tracking_code: String,
    /// Recipient name, if provided.
    pub recipient: Option<String>,
    /// Destination label, if provided.
    pub destination: Option<String>,
    /// Raw status label.
    pub status: Option<String>,
    /// Latitude of the last known position.
    pub latitude: Option<f64>,
    /// Longitude of the last known position.
    pub longitude: Option<f64>,
}

/// Build a point from optional coordinates without judging validity.
fn raw_point(lat: Option<f64>, lng: Option<f64>) -> Option<GeoPoint> {
    Some(GeoPoint::new(lat?, lng?))
}

/// Union projection of agencies and parcels for the map and list views.
///
/// `point` holds whatever coordinates the backend sent, including the
/// `(0, 0)` sentinel; map code filters with [`GeoPoint::is_valid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapEntity {
    /// Backend identifier.
    pub id: String,
    /// Agency or parcel.
    pub kind: EntityKind,
    /// Tracking code (parcels only).
    pub code: Option<String>,
    /// Display label (agency name, recipient).
    pub label: String,
    /// Raw coordinates.
    pub point: Option<GeoPoint>,
    /// Parsed status (parcels only).
    pub status: Option<ShipmentStatus>,
}

impl MapEntity {
    /// Whether the entity can be placed on the map.
    pub fn has_valid_point(&self) -> bool {
        self.point.as_ref().is_some_and(GeoPoint::is_valid)
    }
}

impl From<&Agency> for MapEntity {
    fn from(agency: &Agency) -> Self {
        let point = raw_point(agency.latitude, agency.longitude)
            .map(|p| p.with_label(agency.name.clone()));
        Self {
            id: agency.id.clone(),
            kind: EntityKind::Agency,
            code: None,
            label: agency.name.clone(),
            point,
            status: None,
        }
    }
}

impl From<&Parcel> for MapEntity {
    fn from(parcel: &Parcel) -> Self {
        let label = parcel
            .recipient
            .clone()
            .or_else(|| parcel.destination.clone())
            .unwrap_or_else(|| parcel.tracking_code.clone());
        let point = raw_point(parcel.latitude, parcel.longitude).map(|p| match &parcel.status {
            Some(status) => p.with_status(status.clone()),
            None => p,
        });
        Self {
            id: parcel.id.clone(),
            kind: EntityKind::Parcel,
            code: Some(parcel.tracking_code.clone()),
            label,
            point,
            status: parcel.status.as_deref().and_then(ShipmentStatus::parse_label),
        }
    }
}

/// Search token and status selector applied to entity lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    /// Free-text search token. Blank matches everything.
    pub search: String,
    /// Status selector.
    pub status: StatusFilter,
}

impl FilterState {
    /// A filter with the given token and status selector.
    pub fn new(search: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            search: search.into(),
            status,
        }
    }
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Rectangular geographic region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Envelope {
    /// Southern edge.
    pub min_lat: f64,
    /// Western edge.
    pub min_lng: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Eastern edge.
    pub max_lng: f64,
}

/// What the map currently shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ViewportState {
    /// Center of the view.
    pub center: GeoPoint,
    /// Zoom level (web-map convention, fractional allowed).
    pub zoom: f64,
    /// Region the view was fitted to, if any.
    pub bounds: Option<Envelope>,
}
