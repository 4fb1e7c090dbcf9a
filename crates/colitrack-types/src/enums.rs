//! Enumeration types for the tracking core.
//!
//! Shipment statuses arrive as free text from two sources: the live channel
//! (English wire tags such as `in_transit`) and the REST backend (French
//! labels such as `En transit` or `Livré`). [`normalize_status_label`] folds
//! both into one comparable form and [`ShipmentStatus::parse_label`] maps the
//! known labels onto the enum. Unknown labels are never an error.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Shipment status
// ---------------------------------------------------------------------------

/// Lifecycle status of a shipment.
///
/// Ordered by progression; [`ShipmentStatus::Delivered`] is the terminal
/// status after which no further transition occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ShipmentStatus {
    /// Registered at an agency, not yet moving.
    Registered,
    /// Moving between agencies.
    InTransit,
    /// With a courier for the final leg.
    OutForDelivery,
    /// Handed over to the recipient. Terminal.
    Delivered,
}

/// Known status labels, already normalised, and the status they denote.
const STATUS_LABELS: &[(&str, ShipmentStatus)] = &[
    ("registered", ShipmentStatus::Registered),
    ("pending", ShipmentStatus::Registered),
    ("created", ShipmentStatus::Registered),
    ("enregistre", ShipmentStatus::Registered),
    ("en_attente", ShipmentStatus::Registered),
    ("in_transit", ShipmentStatus::InTransit),
    ("transit", ShipmentStatus::InTransit),
    ("en_transit", ShipmentStatus::InTransit),
    ("expedie", ShipmentStatus::InTransit),
    ("out_for_delivery", ShipmentStatus::OutForDelivery),
    ("en_livraison", ShipmentStatus::OutForDelivery),
    ("en_cours_de_livraison", ShipmentStatus::OutForDelivery),
    ("delivered", ShipmentStatus::Delivered),
    ("livre", ShipmentStatus::Delivered),
];

impl ShipmentStatus {
    /// All statuses in progression order.
    pub const ALL: [Self; 4] = [
        Self::Registered,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
    ];

    /// Map a free-text status label onto a known status.
    ///
    /// Matching is case-, accent- and separator-insensitive (see
    /// [`normalize_status_label`]). Returns `None` for unknown labels.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let normalized = normalize_status_label(raw);
        STATUS_LABELS
            .iter()
            .find(|(label, _)| *label == normalized)
            .map(|(_, status)| *status)
    }

    /// Canonical wire tag for this status.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
        }
    }

    /// Whether this is the terminal status.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl core::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fold a status label into its comparable form.
///
/// Trims, lowercases, strips French diacritics, and turns runs of spaces or
/// hyphens into a single underscore: `"  En cours-de livraison "` becomes
/// `"en_cours_de_livraison"` and `"Livré"` becomes `"livre"`.
pub fn normalize_status_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            ' ' | '-' | '_' => {
                pending_separator = true;
                continue;
            }
            other => other,
        };
        if pending_separator && !out.is_empty() {
            out.push('_');
        }
        pending_separator = false;
        out.push(folded);
    }
    out
}

// ---------------------------------------------------------------------------
// Status filter
// ---------------------------------------------------------------------------

/// Status selector of a [`FilterState`](crate::FilterState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Sentinel that bypasses the status check.
    #[default]
    All,
    /// Keep only entities whose status equals this one.
    Only(ShipmentStatus),
}

impl StatusFilter {
    /// Parse a status selector as sent by list screens.
    ///
    /// `""`, `"all"` and `"tous"` select [`StatusFilter::All`]; anything
    /// else must be a known status label.
    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_status_label(raw).as_str() {
            "" | "all" | "tous" => Some(Self::All),
            _ => ShipmentStatus::parse_label(raw).map(Self::Only),
        }
    }

    /// Path segment used by `GET /colis/{statusFilter}`.
    pub const fn as_path_segment(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Only(status) => status.as_str(),
        }
    }

    /// Whether an entity status passes this selector.
    pub fn accepts(self, status: Option<ShipmentStatus>) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => status == Some(wanted),
        }
    }
}

// ---------------------------------------------------------------------------
// Tracking lifecycle
// ---------------------------------------------------------------------------

/// State of a path accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TrackingPhase {
    /// No valid event received yet.
    Empty,
    /// At least one valid event, status not terminal.
    Tracking,
    /// Terminal status received. Never regresses.
    Delivered,
}

/// Connection state of the live position channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ConnectionState {
    /// The transport is connected.
    Connected,
    /// The transport dropped; reconnection is handled by the transport.
    Disconnected,
}

/// Live-signal indicator shown next to the tracking view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum SignalState {
    /// Subscribed, no event received yet and the stale window has not elapsed.
    AwaitingSignal,
    /// Events are flowing.
    Live,
    /// Connected but no event for longer than the stale window.
    Stale,
    /// The channel connection is down.
    Disconnected,
}

/// Where a timeline step came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum StepSource {
    /// Fetched from `GET /track/{code}`.
    History,
    /// Received on the live position channel.
    Live,
}

/// Kind of a map entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum EntityKind {
    /// A courier agency.
    Agency,
    /// A parcel.
    Parcel,
}

/// Icon shown for a marker. The render surface maps keys to image assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum IconKey {
    /// Origin of a route.
    Start,
    /// Registered, not yet moving.
    Registered,
    /// Default icon for moving parcels and unknown statuses.
    InTransit,
    /// Out for delivery.
    OutForDelivery,
    /// Delivered (terminal).
    Delivered,
    /// Agency location.
    Agency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_accents_and_separators() {
        assert_eq!(normalize_status_label("Livré"), "livre");
        assert_eq!(
            normalize_status_label("  En cours-de  livraison "),
            "en_cours_de_livraison"
        );
        assert_eq!(normalize_status_label("IN_TRANSIT"), "in_transit");
        assert_eq!(normalize_status_label("   "), "");
    }

    #[test]
    fn parse_label_accepts_wire_and_backend_labels() {
        assert_eq!(
            ShipmentStatus::parse_label("delivered"),
            Some(ShipmentStatus::Delivered)
        );
        assert_eq!(
            ShipmentStatus::parse_label("Livré"),
            Some(ShipmentStatus::Delivered)
        );
        assert_eq!(
            ShipmentStatus::parse_label("En transit"),
            Some(ShipmentStatus::InTransit)
        );
        assert_eq!(
            ShipmentStatus::parse_label("en_livraison"),
            Some(ShipmentStatus::OutForDelivery)
        );
        assert_eq!(ShipmentStatus::parse_label("lost_at_sea"), None);
    }

    #[test]
    fn only_delivered_is_terminal() {
        for status in ShipmentStatus::ALL {
            assert_eq!(status.is_terminal(), status == ShipmentStatus::Delivered);
        }
    }

    #[test]
    fn wire_tags_round_trip_through_parse() {
        for status in ShipmentStatus::ALL {
            assert_eq!(ShipmentStatus::parse_label(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ShipmentStatus::OutForDelivery).ok();
        assert_eq!(json.as_deref(), Some("\"out_for_delivery\""));
    }

    #[test]
    fn status_filter_parsing() {
        assert_eq!(StatusFilter::parse("all"), Some(StatusFilter::All));
        assert_eq!(StatusFilter::parse("Tous"), Some(StatusFilter::All));
        assert_eq!(StatusFilter::parse(""), Some(StatusFilter::All));
        assert_eq!(
            StatusFilter::parse("livre"),
            Some(StatusFilter::Only(ShipmentStatus::Delivered))
        );
        assert_eq!(StatusFilter::parse("unknown"), None);
    }

    #[test]
    fn status_filter_accepts() {
        let delivered = StatusFilter::Only(ShipmentStatus::Delivered);
        assert!(delivered.accepts(Some(ShipmentStatus::Delivered)));
        assert!(!delivered.accepts(Some(ShipmentStatus::InTransit)));
        assert!(!delivered.accepts(None));
        assert!(StatusFilter::All.accepts(None));
    }

    #[test]
    fn status_filter_path_segment() {
        assert_eq!(StatusFilter::All.as_path_segment(), "all");
        assert_eq!(
            StatusFilter::Only(ShipmentStatus::InTransit).as_path_segment(),
            "in_transit"
        );
    }
}
