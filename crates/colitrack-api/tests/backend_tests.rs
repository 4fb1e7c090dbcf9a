//! Integration tests for the REST client.
//!
//! Each test serves a small Axum stub of the tracking backend on an
//! ephemeral local port and points an [`ApiClient`] at it.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use colitrack_api::{ApiClient, ApiError, ParcelQuery};
use colitrack_types::{ShipmentStatus, StatusFilter, TrackingCode};

const TOKEN: &str = "test-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"))
}

async fn track(headers: HeaderMap, Path(code): Path<String>) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, r#"{"message":"Unauthenticated."}"#.to_owned());
    }
    if code != "COL123" {
        return (StatusCode::NOT_FOUND, r#"{"message":"Colis introuvable"}"#.to_owned());
    }
    (
        StatusCode::OK,
        r#"{
            "package": {"tracking_code": "COL123", "status": "En transit"},
            "tracking_steps": [
                {"created_at": "2026-03-14 08:00:00", "status": "Enregistré",
                 "location": "Agence Akwa", "latitude": 4.05, "longitude": 9.76}
            ],
            "map_center": {"lat": 4.05, "lng": 9.76}
        }"#
        .to_owned(),
    )
}

async fn agences() -> impl IntoResponse {
    r#"[{"id": 1, "nom": "Agence Akwa", "latitude": 4.05, "longitude": 9.70}]"#
}

async fn colis(
    Path(status): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let search = params.get("search").cloned().unwrap_or_default();
    let code = format!("COL{page}{}", search.to_uppercase());
    format!(
        r#"{{"data": [{{"id": {page}, "tracking_code": "{code}", "statut": "{status}",
            "latitude": 4.06, "longitude": 9.77}}],
            "current_page": {page}, "last_page": 3, "total": 3}}"#
    )
}

async fn spawn_backend() -> String {
    let app = Router::new()
        .route("/api/track/{code}", get(track))
        .route("/api/agences", get(agences))
        .route("/api/colis/{status}", get(colis));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api")
}

fn client(base: &str, token: Option<&str>) -> ApiClient {
    ApiClient::new(base, token.map(ToOwned::to_owned), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn fetch_history_returns_steps() {
    let base = spawn_backend().await;
    let api = client(&base, Some(TOKEN));
    let code = TrackingCode::parse("COL123").unwrap();

    let history = api.fetch_history(&code).await.unwrap();
    assert_eq!(history.code, code);
    assert_eq!(history.steps.len(), 1);
    assert_eq!(history.status_label.as_deref(), Some("En transit"));
    assert!(history.map_center.is_some());
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let base = spawn_backend().await;
    let api = client(&base, Some(TOKEN));
    let code = TrackingCode::parse("XYZ999").unwrap();

    let err = api.fetch_history(&code).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(ref c) if c == "XYZ999"));
}

#[tokio::test]
async fn missing_token_is_session_expired() {
    let base = spawn_backend().await;
    let api = client(&base, None);
    let code = TrackingCode::parse("COL123").unwrap();

    let err = api.fetch_history(&code).await.unwrap_err();
    assert!(err.is_session_expired());
}

#[tokio::test]
async fn agencies_are_listed() {
    let base = spawn_backend().await;
    let api = client(&base, Some(TOKEN));
    let page = api.list_agencies().await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items.first().map(|a| a.name.as_str()), Some("Agence Akwa"));
}

#[tokio::test]
async fn parcel_query_reaches_the_backend() {
    let base = spawn_backend().await;
    let api = client(&base, Some(TOKEN));
    let query = ParcelQuery {
        status: StatusFilter::Only(ShipmentStatus::InTransit),
        search: "abc".to_owned(),
        page: 2,
        per_page: 10,
    };
    let page = api.list_parcels(&query).await.unwrap();
    let parcel = page.items.first().unwrap();
    assert_eq!(parcel.tracking_code, "COL2ABC");
    assert_eq!(parcel.status.as_deref(), Some("in_transit"));
    assert_eq!(page.current_page, 2);
}

#[tokio::test]
async fn all_parcel_pages_are_followed() {
    let base = spawn_backend().await;
    let api = client(&base, Some(TOKEN));
    let parcels = api.list_all_parcels(&ParcelQuery::default(), 10).await.unwrap();
    let codes: Vec<&str> = parcels.iter().map(|p| p.tracking_code.as_str()).collect();
    assert_eq!(codes, vec!["COL1", "COL2", "COL3"]);
}

#[tokio::test]
async fn unreachable_backend_is_a_request_error() {
    let api = client("http://127.0.0.1:9/api", Some(TOKEN));
    let err = api.list_agencies().await.unwrap_err();
    assert!(matches!(err, ApiError::Request(_)));
}
