//! Live position channel for Colitrack.
//!
//! Each tracked shipment has a room. Subscribing announces the join and
//! streams the room's position events; other rooms are never delivered.
//! Delivery order is whatever the transport provides, and duplicates are
//! possible, so consumers must tolerate both.
//!
//! # Modules
//!
//! - [`client`] -- Per-session client, subscriptions and event streams.
//! - [`codec`] -- Subjects and lenient payload decoding.
//! - [`error`] -- Channel error type.
//! - [`transport`] -- NATS and in-process transports.

pub mod client;
pub mod codec;
pub mod error;
pub mod transport;

pub use client::{ChannelClient, ChannelMessage, PositionStream};
pub use codec::{decode_position, encode_position, join_subject, room_subject};
pub use error::ChannelError;
pub use transport::{MemoryHub, NatsTransport, Transport};
