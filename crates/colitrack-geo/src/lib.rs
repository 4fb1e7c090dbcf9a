//! Geospatial logic for the Colitrack map views.
//!
//! Everything in this crate is pure: functions read point sets and entity
//! collections and return new values. The render surface owns nothing here
//! except the [`MapHandle`] it mounts.
//!
//! # Modules
//!
//! - [`envelope`] -- Envelope construction, padding, containment.
//! - [`error`] -- Error types for geometry and viewport configuration.
//! - [`geofilter`] -- Validity filtering, search/status filtering, entity
//!   aggregation and the overview layer.
//! - [`style`] -- Table-driven marker styling.
//! - [`viewport`] -- Bounds computation, viewport fitting, service-area
//!   clamp, map handle lifecycle.

pub mod envelope;
pub mod error;
pub mod geofilter;
pub mod style;
pub mod viewport;

// Re-export primary types at crate root.
pub use error::GeoError;
pub use geofilter::{aggregate, apply_filters, build_entity_layer, filter_valid, matches_search};
pub use style::{MarkerStyle, RouteRole, route_markers, style_for_label, style_for_status};
pub use viewport::{MapHandle, ViewportConfig, ViewportController, visible_extent};
