//! Channel payload encoding.
//!
//! Inbound position payloads are `{ lat, lng, status?, timestamp? }`.
//! Coordinates may be numbers or numeric strings; a missing or unreadable
//! coordinate decodes to `None` and is left for the accumulator to drop.
//! Only payloads that are not JSON objects fail to decode.

use colitrack_types::wire::{lenient_f64, lenient_timestamp};
use colitrack_types::{PositionEvent, TrackingCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChannelError;

/// Subject carrying position events for `code`.
pub fn room_subject(prefix: &str, code: &TrackingCode) -> String {
    format!("{prefix}.{code}.position")
}

/// Subject on which room joins are announced.
pub fn join_subject(prefix: &str) -> String {
    format!("{prefix}.join")
}

/// Join announcement sent when subscribing to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMessage {
    /// Room joined.
    #[serde(rename = "trackingCode")]
    pub tracking_code: TrackingCode,
}

#[derive(Debug, Deserialize)]
struct WirePosition {
    #[serde(default, alias = "latitude")]
    lat: Value,
    #[serde(default, alias = "longitude")]
    lng: Value,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "created_at")]
    timestamp: Value,
}

/// Decode an inbound position payload.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when the payload is not a JSON object.
pub fn decode_position(payload: &[u8]) -> Result<PositionEvent, serde_json::Error> {
    let wire: WirePosition = serde_json::from_slice(payload)?;
    Ok(PositionEvent {
        lat: lenient_f64(&wire.lat),
        lng: lenient_f64(&wire.lng),
        status: wire.status.filter(|s| !s.trim().is_empty()),
        timestamp: lenient_timestamp(&wire.timestamp),
    })
}

/// Encode a position event for publishing.
///
/// # Errors
///
/// Returns [`ChannelError::Serde`] if serialization fails.
pub fn encode_position(event: &PositionEvent) -> Result<Vec<u8>, ChannelError> {
    Ok(serde_json::to_vec(event)?)
}

/// Encode the join announcement for `code`.
///
/// # Errors
///
/// Returns [`ChannelError::Serde`] if serialization fails.
pub fn encode_join(code: &TrackingCode) -> Result<Vec<u8>, ChannelError> {
    Ok(serde_json::to_vec(&JoinMessage {
        tracking_code: code.clone(),
    })?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subjects_are_scoped_by_code() {
        let code = TrackingCode::parse("COL123").unwrap();
        assert_eq!(room_subject("track", &code), "track.COL123.position");
        assert_eq!(join_subject("track"), "track.join");
    }

    #[test]
    fn decodes_numbers_and_strings() {
        let event =
            decode_position(br#"{"lat":"4.05","lng":9.76,"status":"in_transit"}"#).unwrap();
        assert_eq!(event.lat, Some(4.05));
        assert_eq!(event.lng, Some(9.76));
        assert_eq!(event.status.as_deref(), Some("in_transit"));
        assert!(event.timestamp.is_none());
    }

    #[test]
    fn missing_coordinates_decode_to_none() {
        let event = decode_position(br#"{"lng":9.76}"#).unwrap();
        assert!(event.lat.is_none());
        assert!(event.to_point().is_none());
    }

    #[test]
    fn accepts_backend_field_names_and_timestamp() {
        let event = decode_position(
            br#"{"latitude":4.05,"longitude":9.76,"timestamp":"2026-03-14T09:10:00Z"}"#,
        )
        .unwrap();
        assert!(event.to_point().is_some());
        assert!(event.timestamp.is_some());
    }

    #[test]
    fn blank_status_is_dropped() {
        let event = decode_position(br#"{"lat":4.05,"lng":9.76,"status":"  "}"#).unwrap();
        assert!(event.status.is_none());
    }

    #[test]
    fn non_object_payload_is_an_error() {
        assert!(decode_position(b"not json").is_err());
        assert!(decode_position(b"[4.05, 9.76]").is_err());
    }

    #[test]
    fn join_message_uses_camel_case_key() {
        let code = TrackingCode::parse("COL123").unwrap();
        let payload = encode_join(&code).unwrap();
        assert_eq!(payload, br#"{"trackingCode":"COL123"}"#.to_vec());
    }

    #[test]
    fn encoded_events_decode_back() {
        let event = PositionEvent::at(4.05, 9.76).with_status("delivered");
        let decoded = decode_position(&encode_position(&event).unwrap()).unwrap();
        assert_eq!(decoded, event);
    }
}
