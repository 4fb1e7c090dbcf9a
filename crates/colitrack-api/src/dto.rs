//! Backend payloads and their conversion to domain types.
//!
//! The backend is loose about types: ids are numbers or strings,
//! coordinates are numbers, numeric strings or null, and timestamps come
//! as `created_at` or `timestamp`. Wire structs keep those fields as raw
//! JSON and the conversions read them leniently. French field names used
//! by the backend are accepted as aliases.

use colitrack_types::wire::{lenient_f64, lenient_string, lenient_timestamp};
use colitrack_types::{Agency, GeoPoint, Parcel, StepSource, TrackingCode, TrackingStep};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Tracking history
// ---------------------------------------------------------------------------

/// Result of `GET /track/{code}`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackHistory {
    /// Code the history was requested for.
    pub code: TrackingCode,
    /// Current status label of the package, if reported.
    pub status_label: Option<String>,
    /// History steps, in backend order.
    pub steps: Vec<TrackingStep>,
    /// Suggested map center, if valid.
    pub map_center: Option<GeoPoint>,
}

#[derive(Debug, Deserialize)]
struct WireTrack {
    #[serde(default, alias = "colis")]
    package: Option<Value>,
    #[serde(default, alias = "steps", alias = "historique")]
    tracking_steps: Vec<WireStep>,
    #[serde(default)]
    map_center: Option<WireCenter>,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    #[serde(default)]
    timestamp: Value,
    #[serde(default)]
    created_at: Value,
    #[serde(default, alias = "statut")]
    status: Option<String>,
    #[serde(default, alias = "lieu", alias = "localisation")]
    location: Option<String>,
    #[serde(default, alias = "lat")]
    latitude: Value,
    #[serde(default, alias = "lng")]
    longitude: Value,
}

#[derive(Debug, Deserialize)]
struct WireCenter {
    #[serde(default, alias = "latitude")]
    lat: Value,
    #[serde(default, alias = "longitude")]
    lng: Value,
}

fn point_from(lat: &Value, lng: &Value) -> Option<GeoPoint> {
    let point = GeoPoint::new(lenient_f64(lat)?, lenient_f64(lng)?);
    point.is_valid().then_some(point)
}

impl WireStep {
    fn into_step(self) -> TrackingStep {
        let timestamp = lenient_timestamp(&self.timestamp).or_else(|| lenient_timestamp(&self.created_at));
        let status = self.status.unwrap_or_default();
        let point = point_from(&self.latitude, &self.longitude).map(|p| {
            let p = match timestamp {
                Some(ts) => p.with_timestamp(ts),
                None => p,
            };
            let p = p.with_status(status.clone());
            match &self.location {
                Some(label) => p.with_label(label.clone()),
                None => p,
            }
        });
        TrackingStep {
            timestamp,
            status,
            location: self.location,
            point,
            source: StepSource::History,
        }
    }
}

/// Decode a `GET /track/{code}` body.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] when the body is not a tracking response.
pub fn parse_track(code: &TrackingCode, body: &str) -> Result<TrackHistory, ApiError> {
    let wire: WireTrack = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("track response for {code}: {e}")))?;
    let status_label = wire
        .package
        .as_ref()
        .and_then(|p| p.get("status").or_else(|| p.get("statut")))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    Ok(TrackHistory {
        code: code.clone(),
        status_label,
        steps: wire.tracking_steps.into_iter().map(WireStep::into_step).collect(),
        map_center: wire.map_center.and_then(|c| point_from(&c.lat, &c.lng)),
    })
}

// ---------------------------------------------------------------------------
// Entity listings
// ---------------------------------------------------------------------------

/// One page of an entity listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Entities on this page.
    pub items: Vec<T>,
    /// 1-based page number.
    pub current_page: u32,
    /// Last page number.
    pub last_page: u32,
    /// Total entities across pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Whether later pages exist.
    pub const fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Paginated {
        data: Vec<T>,
        #[serde(default)]
        current_page: Option<u32>,
        #[serde(default)]
        last_page: Option<u32>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    fn into_page(self) -> Page<T> {
        match self {
            Self::Paginated {
                data,
                current_page,
                last_page,
                total,
            } => {
                let current_page = current_page.unwrap_or(1);
                Page {
                    total: total.unwrap_or_else(|| u64::try_from(data.len()).unwrap_or(u64::MAX)),
                    last_page: last_page.unwrap_or(current_page),
                    current_page,
                    items: data,
                }
            }
            Self::Bare(items) => Page {
                total: u64::try_from(items.len()).unwrap_or(u64::MAX),
                current_page: 1,
                last_page: 1,
                items,
            },
        }
    }
}

fn parse_listing<W: DeserializeOwned>(body: &str, what: &str) -> Result<Page<W>, ApiError> {
    serde_json::from_str::<Listing<W>>(body)
        .map(Listing::into_page)
        .map_err(|e| ApiError::Decode(format!("{what} listing: {e}")))
}

#[derive(Debug, Deserialize)]
struct WireAgency {
    #[serde(default)]
    id: Value,
    #[serde(default, alias = "nom")]
    name: Option<String>,
    #[serde(default, alias = "ville")]
    city: Option<String>,
    #[serde(default, alias = "lat")]
    latitude: Value,
    #[serde(default, alias = "lng")]
    longitude: Value,
}

impl From<WireAgency> for Agency {
    fn from(wire: WireAgency) -> Self {
        let id = lenient_string(&wire.id).unwrap_or_default();
        Self {
            name: wire.name.unwrap_or_else(|| format!("Agence {id}")),
            id,
            city: wire.city,
            latitude: lenient_f64(&wire.latitude),
            longitude: lenient_f64(&wire.longitude),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireParcel {
    #[serde(default)]
    id: Value,
    #[serde(default, alias = "code_suivi", alias = "numero_suivi")]
    tracking_code: Option<String>,
    #[serde(default, alias = "destinataire", alias = "nom_destinataire")]
    recipient: Option<String>,
    #[serde(default, alias = "adresse_livraison")]
    destination: Option<String>,
    #[serde(default, alias = "statut")]
    status: Option<String>,
    #[serde(default, alias = "lat")]
    latitude: Value,
    #[serde(default, alias = "lng")]
    longitude: Value,
}

impl From<WireParcel> for Parcel {
    fn from(wire: WireParcel) -> Self {
        Self {
            id: lenient_string(&wire.id).unwrap_or_default(),
            tracking_code: wire.tracking_code.unwrap_or_default(),
            recipient: wire.recipient,
            destination: wire.destination,
            status: wire.status,
            latitude: lenient_f64(&wire.latitude),
            longitude: lenient_f64(&wire.longitude),
        }
    }
}

fn convert<W, T: From<W>>(page: Page<W>) -> Page<T> {
    Page {
        items: page.items.into_iter().map(T::from).collect(),
        current_page: page.current_page,
        last_page: page.last_page,
        total: page.total,
    }
}

/// Decode a `GET /agences` body (bare array or paginated).
///
/// # Errors
///
/// Returns [`ApiError::Decode`] when the body is not an agency listing.
pub fn parse_agencies(body: &str) -> Result<Page<Agency>, ApiError> {
    parse_listing::<WireAgency>(body, "agency").map(convert)
}

/// Decode a `GET /colis/{status}` body (bare array or paginated).
///
/// # Errors
///
/// Returns [`ApiError::Decode`] when the body is not a parcel listing.
pub fn parse_parcels(body: &str) -> Result<Page<Parcel>, ApiError> {
    parse_listing::<WireParcel>(body, "parcel").map(convert)
}
