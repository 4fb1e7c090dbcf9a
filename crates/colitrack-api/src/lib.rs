//! REST client for the Colitrack tracking backend.
//!
//! Covers the three endpoints the tracking core consumes: shipment history,
//! agencies and parcels. Authentication, CRUD and invoicing endpoints are
//! not part of this client.
//!
//! # Modules
//!
//! - [`client`] -- [`ApiClient`] and [`ParcelQuery`].
//! - [`dto`] -- Lenient decoding of backend payloads.
//! - [`error`] -- [`ApiError`] and status classification.

pub mod client;
pub mod dto;
pub mod error;

pub use client::{ApiClient, ParcelQuery};
pub use dto::{Page, TrackHistory, parse_agencies, parse_parcels, parse_track};
pub use error::{ApiError, classify_status};
