//! Shared type definitions for the Colitrack parcel tracking core.
//!
//! This crate is the single source of truth for the types exchanged between
//! the tracking crates and the render surface. Types flow downstream to
//! `TypeScript` via `ts-rs` so the browser map consumes the same shapes.
//!
//! # Modules
//!
//! - [`ids`] -- [`TrackingCode`] and the UUID-backed [`SessionId`]
//! - [`enums`] -- Shipment status, tracking phase, connection/signal state,
//!   icon keys
//! - [`structs`] -- Points, events, timeline steps, entities, viewport
//! - [`view`] -- Frames and layers pushed to the render surface
//! - [`wire`] -- Lenient readers for loosely-typed JSON fields

pub mod enums;
pub mod ids;
pub mod structs;
pub mod view;
pub mod wire;

// Re-export all public types at crate root for convenience.
pub use enums::{
    ConnectionState, EntityKind, IconKey, ShipmentStatus, SignalState, StatusFilter,
    StepSource, TrackingPhase, normalize_status_label,
};
pub use ids::{SessionId, TrackingCode};
pub use structs::{
    Agency, Envelope, FilterState, GeoPoint, MapEntity, Parcel, PositionEvent, TrackedShipment,
    TrackingStep, ViewportState, is_valid_coordinate,
};
pub use view::{EntityLayer, Marker, ViewFrame};
