//! View frame projection.
//!
//! A [`ViewFrame`] is the serialisable snapshot of one tracking session that
//! the render surface draws: the merged timeline, the route derived from
//! it, styled markers and the viewport fitted to the route.

use std::time::Instant;

use chrono::Utc;
use colitrack_geo::{MapHandle, ViewportController, route_markers};
use colitrack_types::{GeoPoint, ViewFrame};

use crate::reconcile::{ReconcileConfig, route_of};
use crate::session::TrackingSession;

/// Build the frame for `session` and refit the mounted map.
///
/// The viewport is fitted to the plotted route. While the route is empty
/// the backend's suggested map center is used, then the home region.
///
/// The origin is the first plotted point, so it always sits under the
/// start marker once history has located steps.
pub fn build_frame(
    session: &TrackingSession,
    controller: &ViewportController,
    handle: &mut MapHandle,
    reconcile: &ReconcileConfig,
    now: Instant,
) -> ViewFrame {
    let accumulator = session.accumulator();
    let timeline = session.timeline(reconcile);
    let route = route_of(&timeline);
    let markers = route_markers(&route, accumulator.status());
    let origin = route
        .first()
        .cloned()
        .or_else(|| accumulator.origin().cloned());

    let anchor: Vec<GeoPoint>;
    let fit_points: &[GeoPoint] = if route.is_empty() {
        anchor = session.map_center().cloned().into_iter().collect();
        &anchor
    } else {
        &route
    };
    let viewport = controller.update(handle, fit_points).clone();

    ViewFrame {
        session_id: session.id(),
        code: session.code().clone(),
        phase: accumulator.phase(),
        status: accumulator.status(),
        signal: session.signal(now),
        origin,
        route,
        timeline,
        markers,
        viewport,
        dropped_events: accumulator.dropped(),
        generated_at: Utc::now(),
    }
}
