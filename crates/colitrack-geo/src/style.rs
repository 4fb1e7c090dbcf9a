//! Marker styling.
//!
//! Styles come from a lookup table keyed by normalised status tag. Labels
//! that are not in the table are mapped through
//! [`ShipmentStatus::parse_label`] to their canonical tag; anything still
//! unknown gets [`DEFAULT_STYLE`]. Adding a status means adding a row.

use colitrack_types::{
    EntityKind, GeoPoint, IconKey, MapEntity, Marker, ShipmentStatus, normalize_status_label,
};

/// Icon and color of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerStyle {
    /// Icon key understood by the render surface.
    pub icon: IconKey,
    /// CSS color.
    pub color: &'static str,
}

/// Style for moving parcels and for unknown statuses.
pub const DEFAULT_STYLE: MarkerStyle = MarkerStyle {
    icon: IconKey::InTransit,
    color: "#2563eb",
};

/// Style of a route's origin point.
pub const START_STYLE: MarkerStyle = MarkerStyle {
    icon: IconKey::Start,
    color: "#7c3aed",
};

/// Style of agency markers.
pub const AGENCY_STYLE: MarkerStyle = MarkerStyle {
    icon: IconKey::Agency,
    color: "#0f766e",
};

/// Status tag to style.
const STATUS_STYLES: &[(&str, MarkerStyle)] = &[
    (
        "registered",
        MarkerStyle {
            icon: IconKey::Registered,
            color: "#6b7280",
        },
    ),
    ("in_transit", DEFAULT_STYLE),
    (
        "out_for_delivery",
        MarkerStyle {
            icon: IconKey::OutForDelivery,
            color: "#ea580c",
        },
    ),
    (
        "delivered",
        MarkerStyle {
            icon: IconKey::Delivered,
            color: "#16a34a",
        },
    ),
];

fn lookup(tag: &str) -> Option<MarkerStyle> {
    STATUS_STYLES
        .iter()
        .find(|(key, _)| *key == tag)
        .map(|(_, style)| *style)
}

/// Style for a raw status label. `None` and unknown labels get
/// [`DEFAULT_STYLE`].
pub fn style_for_label(label: Option<&str>) -> MarkerStyle {
    let Some(label) = label else {
        return DEFAULT_STYLE;
    };
    lookup(&normalize_status_label(label))
        .or_else(|| ShipmentStatus::parse_label(label).and_then(|s| lookup(s.as_str())))
        .unwrap_or(DEFAULT_STYLE)
}

/// Style for a parsed status.
pub fn style_for_status(status: ShipmentStatus) -> MarkerStyle {
    lookup(status.as_str()).unwrap_or(DEFAULT_STYLE)
}

/// Role of a point within a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRole {
    /// First point.
    Origin,
    /// Intermediate point.
    Waypoint,
    /// Last point of a route with more than one point.
    Current,
}

impl RouteRole {
    /// Role of the point at `index` in a route of `len` points.
    pub const fn of(index: usize, len: usize) -> Self {
        if index == 0 {
            Self::Origin
        } else if index.saturating_add(1) == len {
            Self::Current
        } else {
            Self::Waypoint
        }
    }
}

/// Style of a route point.
///
/// The origin always gets [`START_STYLE`]. The current point reflects the
/// shipment status, so a delivered shipment ends on the delivered icon.
/// Waypoints use their own status label.
pub fn route_style(role: RouteRole, point: &GeoPoint, current: ShipmentStatus) -> MarkerStyle {
    match role {
        RouteRole::Origin => START_STYLE,
        RouteRole::Current => style_for_status(current),
        RouteRole::Waypoint => style_for_label(point.status.as_deref()),
    }
}

fn marker(point: &GeoPoint, style: MarkerStyle) -> Marker {
    Marker {
        lat: point.lat,
        lng: point.lng,
        icon: style.icon,
        color: style.color.to_owned(),
        label: point.label.clone().or_else(|| point.status.clone()),
        entity_id: None,
        kind: None,
    }
}

/// Markers for a route, skipping invalid points.
pub fn route_markers(route: &[GeoPoint], current: ShipmentStatus) -> Vec<Marker> {
    let valid: Vec<&GeoPoint> = route.iter().filter(|p| p.is_valid()).collect();
    let len = valid.len();
    valid
        .into_iter()
        .enumerate()
        .map(|(index, point)| marker(point, route_style(RouteRole::of(index, len), point, current)))
        .collect()
}

/// Style of an entity marker.
pub fn entity_style(entity: &MapEntity) -> MarkerStyle {
    match entity.kind {
        EntityKind::Agency => AGENCY_STYLE,
        EntityKind::Parcel => entity.status.map_or(DEFAULT_STYLE, style_for_status),
    }
}

/// Marker for an entity, `None` when it has no valid position.
pub fn entity_marker(entity: &MapEntity) -> Option<Marker> {
    let point = entity.point.as_ref().filter(|p| p.is_valid())?;
    let mut m = marker(point, entity_style(entity));
    m.label = Some(entity.code.clone().map_or_else(
        || entity.label.clone(),
        |code| format!("{code} - {}", entity.label),
    ));
    m.entity_id = Some(entity.id.clone());
    m.kind = Some(entity.kind);
    Some(m)
}
