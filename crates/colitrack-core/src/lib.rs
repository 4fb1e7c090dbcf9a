//! Tracking core for Colitrack.
//!
//! Turns live position events and REST history into a coherent view of one
//! shipment. Nothing in this crate performs I/O apart from reading the
//! configuration file; the channel and REST clients live in their own
//! crates and feed the [`Tracker`].
//!
//! # Modules
//!
//! - [`accumulator`] -- Append-only route and `Empty/Tracking/Delivered`
//!   state machine.
//! - [`config`] -- YAML configuration with environment overrides.
//! - [`error`] -- Session routing errors.
//! - [`frame`] -- Projection of a session into a render-ready frame.
//! - [`reconcile`] -- History/live merge and deduplication.
//! - [`session`] -- Tracking sessions and the active-session tracker.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod frame;
pub mod reconcile;
pub mod session;

pub use accumulator::{ApplyOutcome, PathAccumulator};
pub use config::{ColitrackConfig, ConfigError};
pub use error::TrackError;
pub use frame::build_frame;
pub use reconcile::{ReconcileConfig, merge, route_of};
pub use session::{Tracker, TrackingSession};
