//! Identifier types.
//!
//! [`TrackingCode`] is the external shipment identifier handed out by the
//! backend (e.g. `COL123`). It doubles as the room key for the live position
//! channel, so equality is exact and the value is never normalised beyond
//! trimming surrounding whitespace.
//!
//! [`SessionId`] identifies one tracking session. It uses UUID v7
//! (time-ordered) so logs from successive sessions sort naturally.

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one tracking session (one tracked code, one
    /// accumulator, one channel subscription).
    SessionId
}

/// External shipment identifier.
///
/// Construct through [`TrackingCode::parse`], which trims whitespace and
/// rejects blank input. Deserialization applies the same rule.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrackingCode(String);

impl TrackingCode {
    /// Parse a tracking code from user or wire input.
    ///
    /// Returns `None` when the input is empty after trimming or contains
    /// characters that cannot appear in a channel subject (`.`, `*`, `>`,
    /// whitespace).
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let forbidden = trimmed
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | '*' | '>'));
        if forbidden {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Borrow the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TrackingCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid tracking code: {raw:?}"))
        })
    }
}
