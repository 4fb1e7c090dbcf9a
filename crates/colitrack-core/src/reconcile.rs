//! History reconciler.
//!
//! Merges the REST history of a shipment with the points received live into
//! one timeline. History is authoritative for ordering; live points are
//! slotted in by timestamp, or appended in arrival order when they carry no
//! timestamp.
//!
//! Two entries denote the same event when their rounded coordinates and
//! normalised status match and their timestamps are within the tolerance
//! window. The duplicate is dropped and the earliest timestamp kept.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use colitrack_types::{
    GeoPoint, ShipmentStatus, StepSource, TrackingStep, normalize_status_label,
};
use serde::Deserialize;
use tracing::debug;

/// Deduplication settings.
///
/// Mirrors the `reconcile` section of `colitrack-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReconcileConfig {
    /// Maximum distance between two timestamps of the same event, in
    /// seconds.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: u64,

    /// Decimal places coordinates are rounded to before comparison.
    #[serde(default = "default_coordinate_decimals")]
    pub coordinate_decimals: i32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            tolerance_secs: default_tolerance_secs(),
            coordinate_decimals: default_coordinate_decimals(),
        }
    }
}

const fn default_tolerance_secs() -> u64 {
    120
}

const fn default_coordinate_decimals() -> i32 {
    4
}

/// Timestamped entries first, ascending; untimestamped ones after them.
fn by_timestamp(a: &TrackingStep, b: &TrackingStep) -> Ordering {
    match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Whether two status labels denote the same status.
pub fn same_status(a: &str, b: &str) -> bool {
    match (ShipmentStatus::parse_label(a), ShipmentStatus::parse_label(b)) {
        (Some(x), Some(y)) => x == y,
        _ => normalize_status_label(a) == normalize_status_label(b),
    }
}

fn same_position(a: &GeoPoint, b: &GeoPoint, decimals: i32) -> bool {
    let scale = 10_f64.powi(decimals);
    let close = |x: f64, y: f64| ((x * scale).round() - (y * scale).round()).abs() < 0.5;
    close(a.lat, b.lat) && close(a.lng, b.lng)
}

fn within(a: DateTime<Utc>, b: DateTime<Utc>, tolerance_secs: u64) -> bool {
    a.signed_duration_since(b).num_seconds().unsigned_abs() <= tolerance_secs
}

/// Whether `step` and a candidate at `point` with `status` denote the same
/// event.
///
/// Both timestamps are compared when both are present. Otherwise position
/// and status alone decide.
pub fn is_duplicate(
    step: &TrackingStep,
    point: &GeoPoint,
    status: &str,
    config: &ReconcileConfig,
) -> bool {
    let Some(existing) = &step.point else {
        return false;
    };
    if !same_position(existing, point, config.coordinate_decimals)
        || !same_status(&step.status, status)
    {
        return false;
    }
    match (step.timestamp, point.timestamp) {
        (Some(a), Some(b)) => within(a, b, config.tolerance_secs),
        _ => true,
    }
}

/// Timeline entry for a live point. A point without a status inherits
/// `inherited`.
pub fn live_step(point: &GeoPoint, inherited: Option<&str>) -> TrackingStep {
    let status = point
        .status
        .as_deref()
        .or(inherited)
        .unwrap_or_default()
        .to_owned();
    TrackingStep {
        timestamp: point.timestamp,
        status,
        location: point.label.clone(),
        point: Some(point.clone()),
        source: StepSource::Live,
    }
}

/// Merge `history` with the live `route`.
///
/// - `merge(&[], route)` yields the route as steps, in arrival order, with
///   no deduplication.
/// - `merge(history, &[])` yields the history sorted by timestamp (stable),
///   which is the history itself when it is already ordered.
pub fn merge(
    history: &[TrackingStep],
    route: &[GeoPoint],
    config: &ReconcileConfig,
) -> Vec<TrackingStep> {
    let mut timeline: Vec<TrackingStep> = history.to_vec();
    timeline.sort_by(by_timestamp);

    if history.is_empty() {
        for point in route {
            let inherited = timeline.last().map(|s| s.status.clone());
            timeline.push(live_step(point, inherited.as_deref()));
        }
        return timeline;
    }

    let mut dropped: usize = 0;
    for point in route {
        if insert_live(&mut timeline, point, config) {
            continue;
        }
        dropped = dropped.saturating_add(1);
    }
    if dropped > 0 {
        debug!(
            dropped,
            history = history.len(),
            live = route.len(),
            "live points merged into history as duplicates"
        );
    }
    timeline
}

/// Insert one live point. Returns `false` when it was a duplicate.
fn insert_live(timeline: &mut Vec<TrackingStep>, point: &GeoPoint, config: &ReconcileConfig) -> bool {
    let Some(ts) = point.timestamp else {
        let inherited = timeline.last().map(|s| s.status.clone());
        let step = live_step(point, inherited.as_deref());
        if timeline
            .last()
            .is_some_and(|last| is_duplicate(last, point, &step.status, config))
        {
            return false;
        }
        timeline.push(step);
        return true;
    };

    let at = timeline.partition_point(|s| s.timestamp.is_some_and(|t| t <= ts));
    let inherited = at
        .checked_sub(1)
        .and_then(|i| timeline.get(i))
        .map(|s| s.status.clone());
    let step = live_step(point, inherited.as_deref());

    let twin = timeline.iter_mut().find(|s| {
        s.timestamp.is_some() && is_duplicate(s, point, &step.status, config)
    });
    if let Some(existing) = twin {
        if existing.timestamp.is_some_and(|t| ts < t) {
            existing.timestamp = Some(ts);
            if let Some(p) = existing.point.as_mut() {
                p.timestamp = Some(ts);
            }
            timeline.sort_by(by_timestamp);
        }
        return false;
    }

    timeline.insert(at, step);
    true
}

/// The plotted route of a timeline: the valid points of its steps, in
/// timeline order.
pub fn route_of(timeline: &[TrackingStep]) -> Vec<GeoPoint> {
    timeline
        .iter()
        .filter_map(|s| s.point.as_ref())
        .filter(|p| p.is_valid())
        .cloned()
        .collect()
}
