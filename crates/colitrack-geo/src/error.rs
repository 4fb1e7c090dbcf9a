//! Error types for the `colitrack-geo` crate.
//!
//! Only construction of envelopes and controller configuration can fail.
//! Invalid coordinates inside point sets are skipped, never reported here.

/// Errors that can occur when building geometry or viewport configuration.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// A coordinate pair is not a valid, renderable position.
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate {
        /// Latitude.
        lat: f64,
        /// Longitude.
        lng: f64,
    },

    /// Envelope edges are inverted or out of range.
    #[error("invalid envelope: lat {min_lat}..{max_lat}, lng {min_lng}..{max_lng}")]
    InvalidEnvelope {
        /// Southern edge.
        min_lat: f64,
        /// Western edge.
        min_lng: f64,
        /// Northern edge.
        max_lat: f64,
        /// Eastern edge.
        max_lng: f64,
    },

    /// Zoom bounds are inverted or negative.
    #[error("invalid zoom range {min}..{max}")]
    InvalidZoomRange {
        /// Minimum zoom.
        min: f64,
        /// Maximum zoom.
        max: f64,
    },

    /// A span or padding value is negative or not finite.
    #[error("invalid {name}: {value}")]
    InvalidParameter {
        /// Configuration key.
        name: &'static str,
        /// Offending value.
        value: f64,
    },
}
