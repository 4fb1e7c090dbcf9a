//! Entity geofilter and aggregator.
//!
//! All functions borrow their input and preserve order. Nothing here mutates
//! an entity collection; list views keep the full collection and map views
//! work on the borrowed subsets returned here.

use colitrack_types::{
    Agency, EntityLayer, FilterState, GeoPoint, MapEntity, Parcel, ViewportState,
};
use tracing::debug;

use crate::style::entity_marker;
use crate::viewport::ViewportController;

/// Project agencies and parcels into one entity list, agencies first.
pub fn aggregate(agencies: &[Agency], parcels: &[Parcel]) -> Vec<MapEntity> {
    agencies
        .iter()
        .map(MapEntity::from)
        .chain(parcels.iter().map(MapEntity::from))
        .collect()
}

/// Entities that can be placed on the map.
///
/// Entities with missing coordinates or the `(0, 0)` sentinel are left out.
pub fn filter_valid(entities: &[MapEntity]) -> Vec<&MapEntity> {
    let valid: Vec<&MapEntity> = entities.iter().filter(|e| e.has_valid_point()).collect();
    let skipped = entities.len().saturating_sub(valid.len());
    if skipped > 0 {
        debug!(skipped, total = entities.len(), "entities without a usable position");
    }
    valid
}

/// Case-insensitive substring match on tracking code or label.
///
/// A blank token matches everything.
pub fn matches_search(entity: &MapEntity, token: &str) -> bool {
    let needle = token.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    let in_code = entity
        .code
        .as_deref()
        .is_some_and(|code| code.to_lowercase().contains(&needle));
    in_code || entity.label.to_lowercase().contains(&needle)
}

/// Apply search and status filters. Coordinates are not considered, so the
/// result is suitable for list views.
pub fn apply_filters<'a>(entities: &'a [MapEntity], filter: &FilterState) -> Vec<&'a MapEntity> {
    entities
        .iter()
        .filter(|e| filter.status.accepts(e.status))
        .filter(|e| matches_search(e, &filter.search))
        .collect()
}

/// Build the agencies/parcels overview: filtered list rows, markers for the
/// rows that have a valid position, and a viewport fitted to those markers.
///
/// The viewport is refit from `current` under the controller's service-area
/// clamp.
pub fn build_entity_layer(
    entities: &[MapEntity],
    filter: &FilterState,
    controller: &ViewportController,
    current: &ViewportState,
) -> EntityLayer {
    let rows: Vec<MapEntity> = apply_filters(entities, filter).into_iter().cloned().collect();
    let markers: Vec<_> = rows.iter().filter_map(entity_marker).collect();
    let points: Vec<GeoPoint> = markers.iter().map(|m| GeoPoint::new(m.lat, m.lng)).collect();
    let viewport = controller.recenter(current, &points, controller.config().service_area.as_ref());
    debug!(
        rows = rows.len(),
        markers = markers.len(),
        search = filter.search,
        "entity layer built"
    );
    EntityLayer {
        rows,
        markers,
        viewport,
    }
}

#[cfg(test)]
mod tests {
    use colitrack_types::{EntityKind, ShipmentStatus, StatusFilter};

    use super::*;
    use crate::viewport::ViewportConfig;

    fn parcel(id: &str, code: &str, status: &str, lat: Option<f64>, lng: Option<f64>) -> Parcel {
        Parcel {
            id: id.to_owned(),
            tracking_code: code.to_owned(),
            recipient: Some(format!("Client {id}")),
            destination: None,
            status: Some(status.to_owned()),
            latitude: lat,
            longitude: lng,
        }
    }

    fn fixture() -> Vec<MapEntity> {
        let agencies = vec![Agency {
            id: "a1".to_owned(),
            name: "Agence Akwa".to_owned(),
            city: Some("Douala".to_owned()),
            latitude: Some(4.05),
            longitude: Some(9.70),
        }];
        let parcels = vec![
            parcel("p1", "COL123", "in_transit", Some(4.06), Some(9.77)),
            parcel("p2", "XYZ999", "delivered", Some(0.0), Some(0.0)),
            parcel("p3", "COL456", "delivered", None, None),
        ];
        aggregate(&agencies, &parcels)
    }

    #[test]
    fn aggregate_keeps_agencies_first() {
        let entities = fixture();
        assert_eq!(entities.len(), 4);
        assert_eq!(entities.first().map(|e| e.kind), Some(EntityKind::Agency));
    }

    #[test]
    fn sentinel_is_excluded_from_map_but_kept_in_list() {
        let entities = fixture();
        let valid = filter_valid(&entities);
        let ids: Vec<&str> = valid.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "p1"]);
        assert!(entities.iter().any(|e| e.id == "p2"));
        assert_eq!(entities.len(), 4);
    }

    #[test]
    fn search_matches_code_exactly_one() {
        let entities = vec![
            MapEntity::from(&parcel("1", "COL123", "in_transit", None, None)),
            MapEntity::from(&parcel("2", "XYZ999", "in_transit", None, None)),
        ];
        let filter = FilterState::new("COL123", StatusFilter::All);
        let found = apply_filters(&entities, &filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().and_then(|e| e.code.as_deref()), Some("COL123"));
    }

    #[test]
    fn search_is_case_insensitive_on_label() {
        let entities = fixture();
        let filter = FilterState::new("akwa", StatusFilter::All);
        let found = apply_filters(&entities, &filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|e| e.id.as_str()), Some("a1"));
    }

    #[test]
    fn status_filter_and_all_sentinel() {
        let entities = fixture();
        let delivered = FilterState::new("", StatusFilter::Only(ShipmentStatus::Delivered));
        let ids: Vec<&str> = apply_filters(&entities, &delivered)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["p2", "p3"]);

        let all = FilterState::default();
        assert_eq!(apply_filters(&entities, &all).len(), entities.len());
    }

    #[test]
    fn filters_preserve_order_and_input() {
        let entities = fixture();
        let before = entities.clone();
        let filter = FilterState::new("col", StatusFilter::All);
        let ids: Vec<&str> = apply_filters(&entities, &filter)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["p1", "p3"]);
        assert_eq!(entities, before);
    }

    #[test]
    fn layer_rows_include_unlocated_entities() {
        let controller = ViewportController::new(ViewportConfig::default());
        assert!(controller.is_ok());
        let Ok(controller) = controller else { return };
        let entities = fixture();
        let layer = build_entity_layer(
            &entities,
            &FilterState::default(),
            &controller,
            &controller.home_viewport(),
        );
        assert_eq!(layer.rows.len(), 4);
        assert_eq!(layer.markers.len(), 2);
        assert!(layer.viewport.bounds.is_some());
    }
}
