//! Path accumulator.
//!
//! Turns the sequence of position events received for one shipment into an
//! append-only route plus derived status.
//!
//! ```text
//!   Empty --first valid event--> Tracking --terminal status--> Delivered
//!     |                                                            ^
//!     +------------first valid event with terminal status---------+
//! ```
//!
//! - Invalid events (missing, non-finite, out-of-range or `(0, 0)`
//!   coordinates) are dropped without touching state.
//! - Valid events always append, in arrival order, including after
//!   delivery (final confirmation pings).
//! - Once delivered, a later non-terminal status is recorded on the point
//!   but never replaces the shipment status.
//!
//! Duplicate deliveries append twice; deduplication belongs to the
//! reconciler.

use colitrack_types::{
    GeoPoint, PositionEvent, ShipmentStatus, TrackedShipment, TrackingCode, TrackingPhase,
};
use tracing::{debug, warn};

/// Result of applying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event's point was appended at `index`.
    Appended {
        /// Position of the new point in the route.
        index: usize,
        /// Phase after the event.
        phase: TrackingPhase,
    },
    /// The event had unusable coordinates and was ignored.
    Dropped,
}

/// Route buffer and state machine for one shipment.
///
/// Exclusively owned by one tracking session. Switching codes means
/// building a new accumulator, never resetting this one.
#[derive(Debug, Clone)]
pub struct PathAccumulator {
    shipment: TrackedShipment,
    phase: TrackingPhase,
    dropped: u64,
}

impl PathAccumulator {
    /// An empty accumulator for `code`.
    pub const fn new(code: TrackingCode) -> Self {
        Self {
            shipment: TrackedShipment::new(code),
            phase: TrackingPhase::Empty,
            dropped: 0,
        }
    }

    /// Tracked code.
    pub const fn code(&self) -> &TrackingCode {
        &self.shipment.code
    }

    /// Current phase.
    pub const fn phase(&self) -> TrackingPhase {
        self.phase
    }

    /// Current status.
    pub const fn status(&self) -> ShipmentStatus {
        self.shipment.status
    }

    /// Route so far. Only ever grows.
    pub fn route(&self) -> &[GeoPoint] {
        &self.shipment.route
    }

    /// First valid point.
    pub const fn origin(&self) -> Option<&GeoPoint> {
        self.shipment.origin.as_ref()
    }

    /// Number of events dropped for invalid coordinates.
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Snapshot view of the whole shipment.
    pub const fn shipment(&self) -> &TrackedShipment {
        &self.shipment
    }

    /// Apply one position event.
    pub fn apply(&mut self, event: &PositionEvent) -> ApplyOutcome {
        let Some(point) = event.to_point() else {
            self.dropped = self.dropped.saturating_add(1);
            warn!(
                code = %self.shipment.code,
                lat = ?event.lat,
                lng = ?event.lng,
                dropped = self.dropped,
                "dropping position event with invalid coordinates"
            );
            return ApplyOutcome::Dropped;
        };

        if self.shipment.origin.is_none() {
            debug!(code = %self.shipment.code, lat = point.lat, lng = point.lng, "origin set");
            self.shipment.origin = Some(point.clone());
        }
        self.shipment.route.push(point);
        let index = self.shipment.route.len().saturating_sub(1);

        if let Some(label) = event.status.as_deref() {
            self.observe_status(label);
        }

        let next = if self.shipment.status.is_terminal() {
            TrackingPhase::Delivered
        } else {
            TrackingPhase::Tracking
        };
        if next != self.phase {
            debug!(code = %self.shipment.code, from = ?self.phase, to = ?next, "phase transition");
            self.phase = next;
        }

        ApplyOutcome::Appended {
            index,
            phase: self.phase,
        }
    }

    /// Record a status label without a position (history seed or event
    /// status). Returns whether the current status changed.
    ///
    /// Known labels replace the status unless the shipment is already
    /// delivered. Unknown labels only update the display label.
    pub fn observe_status(&mut self, label: &str) -> bool {
        if self.shipment.status.is_terminal() {
            debug!(
                code = %self.shipment.code,
                label,
                "ignoring status after delivery"
            );
            return false;
        }
        self.shipment.status_label = Some(label.to_owned());
        match ShipmentStatus::parse_label(label) {
            Some(status) if status != self.shipment.status => {
                self.shipment.status = status;
                if status.is_terminal() && self.phase == TrackingPhase::Tracking {
                    self.phase = TrackingPhase::Delivered;
                }
                true
            }
            Some(_) => false,
            None => {
                debug!(code = %self.shipment.code, label, "unknown status label");
                false
            }
        }
    }
}
