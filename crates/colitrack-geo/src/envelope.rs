//! Envelope arithmetic.
//!
//! Envelopes are plain min/max latitude/longitude rectangles. Routes served
//! by the backend stay within one country, so envelopes never wrap the
//! antimeridian; `min_lng <= max_lng` always holds.

use colitrack_types::{Envelope, GeoPoint, is_valid_coordinate};

use crate::error::GeoError;

/// Latitude range of the world.
pub const WORLD_LAT: (f64, f64) = (-90.0, 90.0);

/// Longitude range of the world.
pub const WORLD_LNG: (f64, f64) = (-180.0, 180.0);

/// Build an envelope, rejecting inverted or out-of-range edges.
///
/// # Errors
///
/// Returns [`GeoError::InvalidEnvelope`] if an edge is not finite, out of
/// WGS84 range, or `min > max` on either axis.
pub fn envelope(
    min_lat: f64,
    min_lng: f64,
    max_lat: f64,
    max_lng: f64,
) -> Result<Envelope, GeoError> {
    let env = Envelope {
        min_lat,
        min_lng,
        max_lat,
        max_lng,
    };
    if is_well_formed(&env) {
        Ok(env)
    } else {
        Err(GeoError::InvalidEnvelope {
            min_lat,
            min_lng,
            max_lat,
            max_lng,
        })
    }
}

/// Whether an envelope has finite, ordered, in-range edges.
pub fn is_well_formed(env: &Envelope) -> bool {
    let finite = [env.min_lat, env.min_lng, env.max_lat, env.max_lng]
        .iter()
        .all(|v| v.is_finite());
    finite
        && env.min_lat <= env.max_lat
        && env.min_lng <= env.max_lng
        && env.min_lat >= WORLD_LAT.0
        && env.max_lat <= WORLD_LAT.1
        && env.min_lng >= WORLD_LNG.0
        && env.max_lng <= WORLD_LNG.1
}

/// Minimal envelope covering every valid point. `None` when no point is
/// valid.
pub fn bounding_envelope(points: &[GeoPoint]) -> Option<Envelope> {
    points
        .iter()
        .filter(|p| p.is_valid())
        .fold(None, |acc: Option<Envelope>, p| {
            Some(acc.map_or(
                Envelope {
                    min_lat: p.lat,
                    min_lng: p.lng,
                    max_lat: p.lat,
                    max_lng: p.lng,
                },
                |env| Envelope {
                    min_lat: env.min_lat.min(p.lat),
                    min_lng: env.min_lng.min(p.lng),
                    max_lat: env.max_lat.max(p.lat),
                    max_lng: env.max_lng.max(p.lng),
                },
            ))
        })
}

/// Square envelope of side `span` degrees centered on a position, clipped to
/// the world.
pub fn around(lat: f64, lng: f64, span: f64) -> Envelope {
    let half = span / 2.0;
    clip_to_world(Envelope {
        min_lat: lat - half,
        min_lng: lng - half,
        max_lat: lat + half,
        max_lng: lng + half,
    })
}

/// Grow each side by `fraction` of the envelope's span on that axis.
pub fn pad(env: &Envelope, fraction: f64) -> Envelope {
    let dlat = lat_span(env) * fraction;
    let dlng = lng_span(env) * fraction;
    clip_to_world(Envelope {
        min_lat: env.min_lat - dlat,
        min_lng: env.min_lng - dlng,
        max_lat: env.max_lat + dlat,
        max_lng: env.max_lng + dlng,
    })
}

/// Widen an envelope symmetrically so neither axis spans less than
/// `min_span` degrees.
pub fn ensure_min_span(env: &Envelope, min_span: f64) -> Envelope {
    let (clat, clng) = center(env);
    let half_lat = lat_span(env).max(min_span) / 2.0;
    let half_lng = lng_span(env).max(min_span) / 2.0;
    clip_to_world(Envelope {
        min_lat: clat - half_lat,
        min_lng: clng - half_lng,
        max_lat: clat + half_lat,
        max_lng: clng + half_lng,
    })
}

/// Clip an envelope to the world rectangle.
pub const fn clip_to_world(env: Envelope) -> Envelope {
    Envelope {
        min_lat: env.min_lat.max(WORLD_LAT.0),
        min_lng: env.min_lng.max(WORLD_LNG.0),
        max_lat: env.max_lat.min(WORLD_LAT.1),
        max_lng: env.max_lng.min(WORLD_LNG.1),
    }
}

/// Latitude extent in degrees.
pub fn lat_span(env: &Envelope) -> f64 {
    env.max_lat - env.min_lat
}

/// Longitude extent in degrees.
pub fn lng_span(env: &Envelope) -> f64 {
    env.max_lng - env.min_lng
}

/// Center as `(lat, lng)`.
pub fn center(env: &Envelope) -> (f64, f64) {
    (
        env.min_lat + lat_span(env) / 2.0,
        env.min_lng + lng_span(env) / 2.0,
    )
}

/// Whether a position lies inside (or on the edge of) the envelope.
pub fn contains(env: &Envelope, lat: f64, lng: f64) -> bool {
    (env.min_lat..=env.max_lat).contains(&lat) && (env.min_lng..=env.max_lng).contains(&lng)
}

/// Whether `inner` lies entirely within `outer`.
pub fn contains_envelope(outer: &Envelope, inner: &Envelope) -> bool {
    contains(outer, inner.min_lat, inner.min_lng) && contains(outer, inner.max_lat, inner.max_lng)
}

/// Overlap of two envelopes, `None` when they are disjoint.
pub fn intersect(a: &Envelope, b: &Envelope) -> Option<Envelope> {
    let env = Envelope {
        min_lat: a.min_lat.max(b.min_lat),
        min_lng: a.min_lng.max(b.min_lng),
        max_lat: a.max_lat.min(b.max_lat),
        max_lng: a.max_lng.min(b.max_lng),
    };
    (env.min_lat <= env.max_lat && env.min_lng <= env.max_lng).then_some(env)
}

/// Validate a coordinate pair into a bare point.
///
/// # Errors
///
/// Returns [`GeoError::InvalidCoordinate`] for missing-equivalent
/// coordinates (see [`is_valid_coordinate`]).
pub fn checked_point(lat: f64, lng: f64) -> Result<GeoPoint, GeoError> {
    if is_valid_coordinate(lat, lng) {
        Ok(GeoPoint::new(lat, lng))
    } else {
        Err(GeoError::InvalidCoordinate { lat, lng })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn bounding_skips_invalid_points() {
        let points = vec![
            GeoPoint::new(4.05, 9.76),
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(f64::NAN, 9.0),
            GeoPoint::new(4.10, 9.80),
        ];
        let env = bounding_envelope(&points);
        assert!(env.is_some());
        if let Some(env) = env {
            assert!(close(env.min_lat, 4.05));
            assert!(close(env.max_lat, 4.10));
            assert!(close(env.min_lng, 9.76));
            assert!(close(env.max_lng, 9.80));
        }
    }

    #[test]
    fn bounding_of_nothing_is_none() {
        assert!(bounding_envelope(&[]).is_none());
        assert!(bounding_envelope(&[GeoPoint::new(0.0, 0.0)]).is_none());
    }

    #[test]
    fn pad_grows_each_side_by_fraction() {
        let env = Envelope {
            min_lat: 4.0,
            min_lng: 9.0,
            max_lat: 5.0,
            max_lng: 11.0,
        };
        let padded = pad(&env, 0.2);
        assert!(close(padded.min_lat, 3.8));
        assert!(close(padded.max_lat, 5.2));
        assert!(close(padded.min_lng, 8.6));
        assert!(close(padded.max_lng, 11.4));
        assert!(contains_envelope(&padded, &env));
    }

    #[test]
    fn around_is_centered() {
        let env = around(4.05, 9.76, 0.02);
        let (lat, lng) = center(&env);
        assert!(close(lat, 4.05));
        assert!(close(lng, 9.76));
        assert!(close(lat_span(&env), 0.02));
    }

    #[test]
    fn ensure_min_span_widens_degenerate_envelopes() {
        let env = Envelope {
            min_lat: 4.05,
            min_lng: 9.76,
            max_lat: 4.05,
            max_lng: 9.76,
        };
        let widened = ensure_min_span(&env, 0.02);
        assert!(close(lat_span(&widened), 0.02));
        assert!(close(lng_span(&widened), 0.02));
        assert!(contains(&widened, 4.05, 9.76));
    }

    #[test]
    fn clip_keeps_world_range() {
        let env = pad(
            &Envelope {
                min_lat: -89.0,
                min_lng: -179.0,
                max_lat: 89.0,
                max_lng: 179.0,
            },
            0.5,
        );
        assert!(is_well_formed(&env));
    }

    #[test]
    fn intersect_disjoint_is_none() {
        let a = around(4.0, 9.0, 1.0);
        let b = around(40.0, 9.0, 1.0);
        assert!(intersect(&a, &b).is_none());
        assert!(intersect(&a, &a).is_some());
    }

    #[test]
    fn envelope_constructor_validates() {
        assert!(envelope(3.9, 9.6, 4.2, 9.9).is_ok());
        assert!(envelope(4.2, 9.6, 3.9, 9.9).is_err());
        assert!(envelope(-91.0, 9.6, 3.9, 9.9).is_err());
    }

    #[test]
    fn checked_point_rejects_sentinel() {
        assert!(checked_point(0.0, 0.0).is_err());
        assert!(checked_point(4.05, 9.76).is_ok());
    }
}
