//! Error types for tracking sessions.
//!
//! Invalid coordinates are not errors at this level: the accumulator drops
//! them and reports [`ApplyOutcome::Dropped`](crate::accumulator::ApplyOutcome).

use colitrack_types::TrackingCode;

/// Errors returned when routing channel events or REST responses to the
/// active tracking session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackError {
    /// The message belongs to a code that is no longer tracked.
    #[error("stale response for {received} (active: {active})")]
    StaleResponse {
        /// Code currently tracked.
        active: TrackingCode,
        /// Code the message was tagged with.
        received: TrackingCode,
    },

    /// No code is tracked at the moment.
    #[error("no active tracking session (received {received})")]
    NoActiveSession {
        /// Code the message was tagged with.
        received: TrackingCode,
    },
}
