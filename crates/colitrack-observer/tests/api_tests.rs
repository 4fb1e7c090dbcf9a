//! Integration tests for the view server endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use colitrack_core::{ReconcileConfig, TrackingSession, build_frame};
use colitrack_geo::{ViewportConfig, ViewportController};
use colitrack_observer::router::build_router;
use colitrack_observer::state::AppState;
use colitrack_types::{EntityKind, GeoPoint, MapEntity, PositionEvent, ShipmentStatus, TrackingCode};
use serde_json::Value;
use tower::ServiceExt;

fn controller() -> ViewportController {
    ViewportController::new(ViewportConfig::default()).unwrap()
}

fn parcel(id: &str, code: &str, status: ShipmentStatus, point: Option<GeoPoint>) -> MapEntity {
    MapEntity {
        id: id.to_owned(),
        kind: EntityKind::Parcel,
        code: Some(code.to_owned()),
        label: format!("Client {id}"),
        point,
        status: Some(status),
    }
}

async fn make_test_state() -> Arc<AppState> {
    let state = Arc::new(AppState::new(controller()));
    state
        .set_entities(vec![
            MapEntity {
                id: "a1".to_owned(),
                kind: EntityKind::Agency,
                code: None,
                label: "Agence Akwa".to_owned(),
                point: Some(GeoPoint::new(4.05, 9.70)),
                status: None,
            },
            parcel("p1", "COL123", ShipmentStatus::InTransit, Some(GeoPoint::new(4.06, 9.77))),
            parcel("p2", "XYZ999", ShipmentStatus::Delivered, Some(GeoPoint::new(0.0, 0.0))),
        ])
        .await;
    state
}

fn delivered_frame() -> colitrack_types::ViewFrame {
    let now = Instant::now();
    let mut session = TrackingSession::new(
        TrackingCode::parse("COL123").unwrap(),
        Duration::from_secs(60),
        now,
    );
    session.apply_position(&PositionEvent::at(4.05, 9.76), now);
    session.apply_position(&PositionEvent::at(4.06, 9.77).with_status("in_transit"), now);
    session.apply_position(&PositionEvent::at(4.10, 9.80).with_status("delivered"), now);
    let controller = controller();
    let mut handle = controller.mount();
    build_frame(&session, &controller, &mut handle, &ReconcileConfig::default(), now)
}

async fn get_json(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state().await;
    let response = build_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_frame_is_404_before_tracking() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/frame").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_published_frame_is_served() {
    let state = make_test_state().await;
    state.publish_frame(delivered_frame()).await;

    let (status, json) = get_json(state, "/api/frame").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["code"], "COL123");
    assert_eq!(json["status"], "delivered");
    assert_eq!(json["phase"], "delivered");
    assert_eq!(json["route"].as_array().unwrap().len(), 3);
    assert_eq!(json["origin"]["lat"], 4.05);
}

#[tokio::test]
async fn test_cleared_frame_is_gone() {
    let state = make_test_state().await;
    state.publish_frame(delivered_frame()).await;
    state.clear_frame().await;
    let (status, _) = get_json(state, "/api/frame").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_entities_unfiltered() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/entities").await;
    assert_eq!(status, StatusCode::OK);
    // The (0, 0) parcel stays in the list but gets no marker.
    assert_eq!(json["rows"].as_array().unwrap().len(), 3);
    assert_eq!(json["markers"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_entities_search() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/entities?search=COL123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rows"].as_array().unwrap().len(), 1);
    assert_eq!(json["rows"][0]["code"], "COL123");
}

#[tokio::test]
async fn test_entities_status_filter() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/entities?status=delivered").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rows"].as_array().unwrap().len(), 1);
    assert_eq!(json["rows"][0]["code"], "XYZ999");
    assert!(json["markers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_entities_bad_status() {
    let state = make_test_state().await;
    let (status, json) = get_json(state, "/api/entities?status=teleported").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_health() {
    let state = make_test_state().await;
    state.publish_frame(delivered_frame()).await;
    let (status, json) = get_json(state, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["tracking"], "COL123");
    assert_eq!(json["entities"], 3);
    assert_eq!(json["frames_published"], 1);
}

#[tokio::test]
async fn test_publish_reaches_subscribers() {
    let state = make_test_state().await;
    let mut rx = state.subscribe();
    let delivered = state.publish_frame(delivered_frame()).await;
    assert_eq!(delivered, 1);
    let frame = rx.recv().await.unwrap();
    assert_eq!(frame.code.as_str(), "COL123");
}

#[tokio::test]
async fn test_publish_without_subscribers() {
    let state = make_test_state().await;
    assert_eq!(state.publish_frame(delivered_frame()).await, 0);
}
