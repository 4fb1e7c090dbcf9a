//! Map viewport controller.
//!
//! Computes bounding regions from point sets and fits the viewport to them.
//!
//! # Projection model
//!
//! Zoom follows the web-map convention: at zoom `z` the visible extent spans
//! `360 / 2^z` degrees of longitude and `180 / 2^z` degrees of latitude
//! around the center. This equirectangular approximation is exact enough at
//! delivery-network scale and keeps fitting symmetric in both axes.
//!
//! # Fitting rules
//!
//! | Valid points | Center | Zoom | Bounds |
//! |---|---|---|---|
//! | 0 | home | default | none |
//! | 1 | the point | unchanged | point-centered |
//! | 2+ | envelope center | largest zoom containing the padded envelope | padded envelope |
//!
//! A fixed service-area envelope then clamps the result: zoom cannot drop
//! below the level at which the view fits inside the service area, and the
//! center is pulled in so the visible extent never leaves it.
//!
//! # Handle lifecycle
//!
//! A [`MapHandle`] is created once per map mount by
//! [`ViewportController::mount`], updated in place by
//! [`ViewportController::update`] and consumed by [`MapHandle::release`].

use colitrack_types::{Envelope, GeoPoint, ViewportState};
use serde::Deserialize;
use tracing::debug;

use crate::envelope::{
    around, bounding_envelope, center, clip_to_world, ensure_min_span, intersect,
    is_well_formed, lat_span, lng_span, pad,
};
use crate::error::GeoError;

/// Degrees of longitude visible at zoom 0.
pub const WORLD_LNG_SPAN: f64 = 360.0;

/// Degrees of latitude visible at zoom 0.
pub const WORLD_LAT_SPAN: f64 = 180.0;

/// Viewport configuration.
///
/// Mirrors the `viewport` section of `colitrack-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ViewportConfig {
    /// Latitude of the home region center.
    #[serde(default = "default_home_lat")]
    pub home_lat: f64,

    /// Longitude of the home region center.
    #[serde(default = "default_home_lng")]
    pub home_lng: f64,

    /// Side of the home region envelope, in degrees.
    #[serde(default = "default_home_span")]
    pub home_span: f64,

    /// Zoom used when there is nothing to show.
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,

    /// Lowest zoom the view may use.
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,

    /// Highest zoom the view may use.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,

    /// Fraction of the envelope span added on each side before fitting.
    #[serde(default = "default_padding_fraction")]
    pub padding_fraction: f64,

    /// Side of the envelope around a single point, in degrees. Also the
    /// minimum span of a fitted envelope.
    #[serde(default = "default_single_point_span")]
    pub single_point_span: f64,

    /// Optional service-area clamp.
    #[serde(default)]
    pub service_area: Option<Envelope>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            home_lat: default_home_lat(),
            home_lng: default_home_lng(),
            home_span: default_home_span(),
            default_zoom: default_zoom(),
            min_zoom: default_min_zoom(),
            max_zoom: default_max_zoom(),
            padding_fraction: default_padding_fraction(),
            single_point_span: default_single_point_span(),
            service_area: None,
        }
    }
}

impl ViewportConfig {
    /// Check ranges and the service-area envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`GeoError`] naming the first invalid setting.
    pub fn validate(&self) -> Result<(), GeoError> {
        if !colitrack_types::is_valid_coordinate(self.home_lat, self.home_lng) {
            return Err(GeoError::InvalidCoordinate {
                lat: self.home_lat,
                lng: self.home_lng,
            });
        }
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite())
            || self.min_zoom < 0.0
            || self.min_zoom > self.max_zoom
        {
            return Err(GeoError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        let positive = [
            ("home_span", self.home_span),
            ("single_point_span", self.single_point_span),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeoError::InvalidParameter { name, value });
            }
        }
        if !self.padding_fraction.is_finite() || self.padding_fraction < 0.0 {
            return Err(GeoError::InvalidParameter {
                name: "padding_fraction",
                value: self.padding_fraction,
            });
        }
        if !self.default_zoom.is_finite() {
            return Err(GeoError::InvalidParameter {
                name: "default_zoom",
                value: self.default_zoom,
            });
        }
        if let Some(area) = &self.service_area {
            if !is_well_formed(area) {
                return Err(GeoError::InvalidEnvelope {
                    min_lat: area.min_lat,
                    min_lng: area.min_lng,
                    max_lat: area.max_lat,
                    max_lng: area.max_lng,
                });
            }
        }
        Ok(())
    }
}

/// Region actually rendered by a viewport.
pub fn visible_extent(viewport: &ViewportState) -> Envelope {
    let scale = viewport.zoom.exp2();
    let half_lng = WORLD_LNG_SPAN / scale / 2.0;
    let half_lat = WORLD_LAT_SPAN / scale / 2.0;
    Envelope {
        min_lat: viewport.center.lat - half_lat,
        min_lng: viewport.center.lng - half_lng,
        max_lat: viewport.center.lat + half_lat,
        max_lng: viewport.center.lng + half_lng,
    }
}

/// Raw zoom at which `span` degrees fill a world of `world_span` degrees.
fn zoom_for_span(world_span: f64, span: f64) -> f64 {
    if span <= 0.0 {
        f64::INFINITY
    } else {
        (world_span / span).log2()
    }
}

/// Margin kept between a clamped extent and the service-area edge so
/// rounding never pushes the extent past it.
const EDGE_EPSILON: f64 = 1e-9;

/// Clamp a center coordinate so `[value - half, value + half]` stays within
/// `[min, max]`; falls back to the range midpoint when it cannot.
fn clamp_axis(value: f64, min: f64, max: f64, half: f64) -> f64 {
    let lo = min + half + EDGE_EPSILON;
    let hi = max - half - EDGE_EPSILON;
    if lo > hi {
        min + (max - min) / 2.0
    } else {
        value.clamp(lo, hi)
    }
}

/// Fits viewports to point sets.
#[derive(Debug, Clone)]
pub struct ViewportController {
    config: ViewportConfig,
}

impl ViewportController {
    /// Create a controller from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`GeoError`] when the configuration is invalid.
    pub fn new(config: ViewportConfig) -> Result<Self, GeoError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The controller configuration.
    pub const fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Home center at the default zoom, without bounds.
    pub fn home_viewport(&self) -> ViewportState {
        ViewportState {
            center: GeoPoint::new(self.config.home_lat, self.config.home_lng),
            zoom: self.clamp_zoom(self.config.default_zoom),
            bounds: None,
        }
    }

    /// Bounding region for a point set.
    ///
    /// - no valid point: the configured home region
    /// - one valid point: an envelope centered on it
    /// - two or more: the minimal covering envelope, padded
    pub fn compute_bounds(&self, points: &[GeoPoint]) -> Envelope {
        let valid: Vec<&GeoPoint> = points.iter().filter(|p| p.is_valid()).collect();
        match valid.as_slice() {
            [] => around(
                self.config.home_lat,
                self.config.home_lng,
                self.config.home_span,
            ),
            [only] => around(only.lat, only.lng, self.config.single_point_span),
            _ => self.padded_bounds(points).unwrap_or_else(|| {
                around(
                    self.config.home_lat,
                    self.config.home_lng,
                    self.config.home_span,
                )
            }),
        }
    }

    /// Padded envelope of the valid points, widened to the minimum span.
    fn padded_bounds(&self, points: &[GeoPoint]) -> Option<Envelope> {
        let raw = bounding_envelope(points)?;
        let padded = pad(&raw, self.config.padding_fraction);
        Some(ensure_min_span(&padded, self.config.single_point_span))
    }

    /// Largest zoom (whole levels) whose visible extent contains `env`.
    pub fn fit_zoom(&self, env: &Envelope) -> f64 {
        let zoom = zoom_for_span(WORLD_LNG_SPAN, lng_span(env))
            .min(zoom_for_span(WORLD_LAT_SPAN, lat_span(env)))
            .floor();
        self.clamp_zoom(zoom)
    }

    /// Smallest zoom (whole levels) whose visible extent fits inside `env`.
    pub fn fill_zoom(&self, env: &Envelope) -> f64 {
        let zoom = zoom_for_span(WORLD_LNG_SPAN, lng_span(env))
            .max(zoom_for_span(WORLD_LAT_SPAN, lat_span(env)))
            .ceil();
        self.clamp_zoom(zoom)
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.config.default_zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        }
        zoom.clamp(self.config.min_zoom, self.config.max_zoom)
    }

    /// Fit `viewport` to `points`, optionally clamped to `fixed`.
    ///
    /// Invalid points are ignored. The input viewport is only read for its
    /// zoom (kept when exactly one valid point is present).
    pub fn recenter(
        &self,
        viewport: &ViewportState,
        points: &[GeoPoint],
        fixed: Option<&Envelope>,
    ) -> ViewportState {
        let valid: Vec<&GeoPoint> = points.iter().filter(|p| p.is_valid()).collect();
        let fitted = match valid.as_slice() {
            [] => self.home_viewport(),
            [only] => ViewportState {
                center: GeoPoint::new(only.lat, only.lng),
                zoom: self.clamp_zoom(viewport.zoom),
                bounds: Some(around(only.lat, only.lng, self.config.single_point_span)),
            },
            _ => match self.padded_bounds(points) {
                Some(env) => {
                    let (lat, lng) = center(&env);
                    ViewportState {
                        center: GeoPoint::new(lat, lng),
                        zoom: self.fit_zoom(&env),
                        bounds: Some(env),
                    }
                }
                None => self.home_viewport(),
            },
        };
        debug!(
            points = points.len(),
            valid = valid.len(),
            zoom = fitted.zoom,
            "viewport fitted"
        );
        match fixed {
            Some(area) => self.clamp_to(fitted, area),
            None => fitted,
        }
    }

    /// Clamp a viewport so its visible extent stays inside `area`.
    pub fn clamp_to(&self, viewport: ViewportState, area: &Envelope) -> ViewportState {
        let area = clip_to_world(*area);
        let zoom = viewport.zoom.max(self.fill_zoom(&area));
        let scale = zoom.exp2();
        let half_lat = WORLD_LAT_SPAN / scale / 2.0;
        let half_lng = WORLD_LNG_SPAN / scale / 2.0;
        let lat = clamp_axis(viewport.center.lat, area.min_lat, area.max_lat, half_lat);
        let lng = clamp_axis(viewport.center.lng, area.min_lng, area.max_lng, half_lng);
        let bounds = viewport
            .bounds
            .map(|b| intersect(&b, &area).unwrap_or(area));
        ViewportState {
            center: GeoPoint::new(lat, lng),
            zoom,
            bounds,
        }
    }

    /// Create the handle for a freshly mounted map, showing the home region.
    pub fn mount(&self) -> MapHandle {
        debug!("map handle mounted");
        MapHandle {
            viewport: self.home_viewport(),
            updates: 0,
        }
    }

    /// Refit a mounted map to a new point set, applying the configured
    /// service-area clamp.
    pub fn update<'h>(&self, handle: &'h mut MapHandle, points: &[GeoPoint]) -> &'h ViewportState {
        handle.viewport = self.recenter(&handle.viewport, points, self.config.service_area.as_ref());
        handle.updates = handle.updates.saturating_add(1);
        &handle.viewport
    }
}

/// Owned handle on one mounted map.
///
/// Holds the viewport across updates. Dropping or releasing it ends the
/// map's lifetime; there is no shared map state elsewhere.
#[derive(Debug)]
pub struct MapHandle {
    viewport: ViewportState,
    updates: u64,
}

impl MapHandle {
    /// Current viewport.
    pub const fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// Number of updates applied since mount.
    pub const fn updates(&self) -> u64 {
        self.updates
    }

    /// Unmount the map, returning its last viewport.
    pub fn release(self) -> ViewportState {
        debug!(updates = self.updates, "map handle released");
        self.viewport
    }
}

const fn default_home_lat() -> f64 {
    4.0511
}

const fn default_home_lng() -> f64 {
    9.7679
}

const fn default_home_span() -> f64 {
    0.1
}

const fn default_zoom() -> f64 {
    12.0
}

const fn default_min_zoom() -> f64 {
    0.0
}

const fn default_max_zoom() -> f64 {
    18.0
}

const fn default_padding_fraction() -> f64 {
    0.2
}

const fn default_single_point_span() -> f64 {
    0.02
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{contains, contains_envelope};

    fn controller() -> ViewportController {
        ViewportController::new(ViewportConfig::default())
            .unwrap_or_else(|_| ViewportController { config: ViewportConfig::default() })
    }

    fn douala_area() -> Envelope {
        Envelope {
            min_lat: 3.9,
            min_lng: 9.6,
            max_lat: 4.2,
            max_lng: 9.9,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ViewportConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_zoom_range_is_rejected() {
        let config = ViewportConfig {
            min_zoom: 10.0,
            max_zoom: 5.0,
            ..ViewportConfig::default()
        };
        assert!(ViewportController::new(config).is_err());
    }

    #[test]
    fn empty_bounds_fall_back_to_home_region() {
        let c = controller();
        let env = c.compute_bounds(&[]);
        assert!(contains(&env, 4.0511, 9.7679));
        assert!((lat_span(&env) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn single_point_bounds_are_point_centered() {
        let c = controller();
        let env = c.compute_bounds(&[GeoPoint::new(4.05, 9.76)]);
        let (lat, lng) = center(&env);
        assert!((lat - 4.05).abs() < 1e-9);
        assert!((lng - 9.76).abs() < 1e-9);
    }

    #[test]
    fn two_point_bounds_contain_both_with_padding() {
        let c = controller();
        let a = GeoPoint::new(4.05, 9.76);
        let b = GeoPoint::new(4.10, 9.80);
        let env = c.compute_bounds(&[a.clone(), b.clone()]);
        assert!(contains(&env, a.lat, a.lng));
        assert!(contains(&env, b.lat, b.lng));
        assert!(env.min_lat < a.lat);
        assert!(env.max_lng > b.lng);
    }

    #[test]
    fn recenter_with_no_points_goes_home() {
        let c = controller();
        let current = ViewportState {
            center: GeoPoint::new(5.0, 10.0),
            zoom: 7.0,
            bounds: None,
        };
        let v = c.recenter(&current, &[GeoPoint::new(0.0, 0.0)], None);
        assert_eq!(v, c.home_viewport());
    }

    #[test]
    fn recenter_single_point_keeps_zoom() {
        let c = controller();
        let current = ViewportState {
            center: GeoPoint::new(5.0, 10.0),
            zoom: 7.0,
            bounds: None,
        };
        let v = c.recenter(&current, &[GeoPoint::new(4.05, 9.76)], None);
        assert!((v.zoom - 7.0).abs() < f64::EPSILON);
        assert!((v.center.lat - 4.05).abs() < 1e-9);
        assert!((v.center.lng - 9.76).abs() < 1e-9);
    }

    #[test]
    fn recenter_many_points_shows_all_of_them() {
        let c = controller();
        let points = vec![
            GeoPoint::new(4.05, 9.76),
            GeoPoint::new(4.06, 9.77),
            GeoPoint::new(3.87, 11.52),
        ];
        let v = c.recenter(&c.home_viewport(), &points, None);
        let extent = visible_extent(&v);
        for p in &points {
            assert!(contains(&extent, p.lat, p.lng));
        }
        if let Some(bounds) = &v.bounds {
            assert!(contains_envelope(&extent, bounds));
        }
    }

    #[test]
    fn identical_points_do_not_blow_up_zoom() {
        let c = controller();
        let points = vec![GeoPoint::new(4.05, 9.76), GeoPoint::new(4.05, 9.76)];
        let v = c.recenter(&c.home_viewport(), &points, None);
        assert!(v.zoom.is_finite());
        assert!(v.zoom <= c.config().max_zoom);
    }

    #[test]
    fn service_area_clamps_view_inside_envelope() {
        let c = controller();
        let area = douala_area();
        let points = vec![GeoPoint::new(4.05, 9.76), GeoPoint::new(3.87, 11.52)];
        let v = c.recenter(&c.home_viewport(), &points, Some(&area));
        let extent = visible_extent(&v);
        assert!(contains_envelope(&area, &extent));
        if let Some(bounds) = &v.bounds {
            assert!(contains_envelope(&area, bounds));
        }
    }

    #[test]
    fn service_area_keeps_points_inside_visible() {
        let c = controller();
        let area = douala_area();
        let points = vec![GeoPoint::new(4.05, 9.76), GeoPoint::new(4.06, 9.77)];
        let v = c.recenter(&c.home_viewport(), &points, Some(&area));
        let extent = visible_extent(&v);
        assert!(contains_envelope(&area, &extent));
        for p in &points {
            assert!(contains(&extent, p.lat, p.lng));
        }
    }

    #[test]
    fn handle_updates_in_place_and_releases() {
        let c = controller();
        let mut handle = c.mount();
        assert_eq!(handle.viewport(), &c.home_viewport());

        let zoom = c
            .update(&mut handle, &[GeoPoint::new(4.05, 9.76), GeoPoint::new(4.10, 9.80)])
            .zoom;
        assert!(zoom > c.config().default_zoom - 5.0);
        assert_eq!(handle.updates(), 1);

        let last = handle.release();
        assert!(last.bounds.is_some());
    }
}
