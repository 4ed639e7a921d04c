// Integration tests for Networkk Search

use std::time::Duration;

use networkk_search::models::{Coordinate, CriteriaUpdate, RawServiceRecord, SortKey, SortOrder};
use networkk_search::services::{
    DataSourceError, HttpDataSource, LocationError, LocationProvider, ServiceDataSource, StaticLocation,
};
use networkk_search::session::{SearchSession, SessionError, SessionOptions};
use serde_json::{json, Value};

fn create_test_listing(id: &str, price: Value, rating: f64, open: bool, lat: f64, lon: f64) -> Value {
    json!({
        "serviceId": id,
        "category": "Plumbing",
        "description": "Leak repairs and fittings",
        "basePrice": price,
        "isOpen": open,
        "avgRating": rating,
        "locality": "Koramangala",
        "status": "accepted",
        "holidays": "[]",
        "serviceProvider": { "fname": "Vikram", "lname": "Singh", "latitude": lat.to_string(), "longitude": lon.to_string() }
    })
}

fn listings(values: Vec<Value>) -> Vec<RawServiceRecord> {
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect()
}

fn sample_listings() -> Vec<RawServiceRecord> {
    listings(vec![
        create_test_listing("near-cheap", json!(50), 4.2, true, 0.0, 0.1),
        create_test_listing("near-pricey", json!(100), 4.8, true, 0.0, 0.2),
        create_test_listing("far", json!(70), 4.9, true, 0.0, 1.0),
        create_test_listing("closed", json!(60), 5.0, false, 0.0, 0.1),
    ])
}

struct VecSource(Vec<RawServiceRecord>);

impl ServiceDataSource for VecSource {
    async fn fetch_services(&self) -> Result<Vec<RawServiceRecord>, DataSourceError> {
        Ok(self.0.clone())
    }
}

struct FailingSource;

impl ServiceDataSource for FailingSource {
    async fn fetch_services(&self) -> Result<Vec<RawServiceRecord>, DataSourceError> {
        Err(DataSourceError::ApiError("Failed to fetch services: 503 Service Unavailable".into()))
    }
}

struct DeniedLocation;

impl LocationProvider for DeniedLocation {
    async fn current_location(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::PermissionDenied)
    }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_updates_coalesce_into_one_execution() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();
    session.replace_records(sample_listings()).await.unwrap();

    let mut last = 0;
    for min_price in [10.0, 20.0, 30.0, 40.0, 60.0] {
        last = session
            .update_criteria(CriteriaUpdate::new().min_price(Some(min_price)))
            .await
            .unwrap();
    }

    let view = session.wait_for_version(last).await.unwrap();

    assert_eq!(view.executions, 1, "one run per quiescence window");
    assert_eq!(view.results.version, last);
    // Rating order: far (4.9) before near-pricey (4.8)
    assert_eq!(view.results.ids(), vec!["far", "near-pricey"]);
}

#[tokio::test(start_paused = true)]
async fn test_change_before_expiry_restarts_window() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();
    session.replace_records(sample_listings()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let version = session
        .update_criteria(CriteriaUpdate::new().open_only(false))
        .await
        .unwrap();

    // 400ms after the first change, but only 200ms after the second
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.view().executions, 0);

    let view = session.wait_for_version(version).await.unwrap();
    assert_eq!(view.executions, 1);
    assert!(view.results.ids().contains(&"closed"));
}

#[tokio::test(start_paused = true)]
async fn test_separate_windows_each_run() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();

    let first = session.replace_records(sample_listings()).await.unwrap();
    session.wait_for_version(first).await.unwrap();

    let second = session
        .update_criteria(CriteriaUpdate::new().sort(SortKey::Price, SortOrder::Asc))
        .await
        .unwrap();
    let view = session.wait_for_version(second).await.unwrap();

    assert_eq!(view.executions, 2);
    assert_eq!(view.results.ids(), vec!["near-cheap", "far", "near-pricey"]);
}

#[tokio::test(start_paused = true)]
async fn test_location_change_triggers_recompute() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();
    session.replace_records(sample_listings()).await.unwrap();
    session
        .update_criteria(CriteriaUpdate::new().max_distance_km(Some(30.0)))
        .await
        .unwrap();

    let version = session.set_location(Coordinate::new(0.0, 0.0)).await.unwrap();
    let view = session.wait_for_version(version).await.unwrap();
    assert_eq!(view.results.ids(), vec!["near-pricey", "near-cheap"]);
    assert_eq!(view.results.origin, Coordinate::new(0.0, 0.0));

    let version = session.set_location(Coordinate::new(0.0, 1.0)).await.unwrap();
    let view = session.wait_for_version(version).await.unwrap();
    assert_eq!(view.results.ids(), vec!["far"]);
}

#[tokio::test(start_paused = true)]
async fn test_load_with_denied_location_skips_distance_filter() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();

    let version = session
        .load(&VecSource(sample_listings()), &DeniedLocation)
        .await
        .unwrap();
    let view = session.wait_for_version(version).await.unwrap();

    // Rating order, closed listing hidden, nothing dropped for distance
    assert_eq!(view.results.ids(), vec!["far", "near-pricey", "near-cheap"]);
    assert!(view.results.origin.is_none());
    assert!(view.last_error.is_none());
    assert_eq!(view.location_error, Some(LocationError::PermissionDenied));
}

#[tokio::test(start_paused = true)]
async fn test_denied_location_after_a_fix_disables_distance() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();

    let version = session
        .load(&VecSource(sample_listings()), &StaticLocation::at(0.0, 0.0))
        .await
        .unwrap();
    let before = session.wait_for_version(version).await.unwrap();
    assert_eq!(before.results.ids(), vec!["near-pricey", "near-cheap"]);
    assert!(before.location_error.is_none());

    let version = session
        .load(&VecSource(sample_listings()), &DeniedLocation)
        .await
        .unwrap();
    let after = session.wait_for_version(version).await.unwrap();
    assert_eq!(after.results.ids(), vec!["far", "near-pricey", "near-cheap"]);
    assert_eq!(after.location_error, Some(LocationError::PermissionDenied));
}

#[tokio::test]
async fn test_odd_field_types_survive_http_decoding() {
    let mut server = mockito::Server::new_async().await;
    let mut listing = create_test_listing("pincode", json!(120), 4.1, true, 0.0, 0.1);
    listing["locality"] = json!(560034);
    listing["serviceProvider"]["fname"] = json!(7);
    let _mock = server
        .mock("GET", "/services")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([listing]).to_string())
        .create_async()
        .await;

    let source = HttpDataSource::new(server.url(), "/services", Duration::from_secs(5)).unwrap();
    let services = source.fetch_services().await.unwrap();
    assert_eq!(services.len(), 1);

    let record = networkk_search::normalize_record(&services[0]);
    let record = record.record().unwrap();
    assert_eq!(record.locality.as_deref(), Some("560034"));
    assert_eq!(record.provider.first_name, "7");
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_preserves_previous_results() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();

    let version = session
        .load(&VecSource(sample_listings()), &StaticLocation::at(0.0, 0.0))
        .await
        .unwrap();
    let before = session.wait_for_version(version).await.unwrap();
    // "far" is beyond the default 50km radius
    assert_eq!(before.results.ids(), vec!["near-pricey", "near-cheap"]);

    let err = session
        .load(&FailingSource, &StaticLocation::at(0.0, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Fetch(_)));

    // Nothing is scheduled after a failed fetch
    tokio::time::sleep(Duration::from_secs(2)).await;

    let after = session.view();
    assert_eq!(after.last_error, Some(err));
    assert_eq!(after.executions, before.executions);
    assert_eq!(after.results.ids(), before.results.ids());

    // A later successful fetch clears the error
    let version = session
        .load(&VecSource(sample_listings()), &StaticLocation::at(0.0, 0.0))
        .await
        .unwrap();
    let recovered = session.wait_for_version(version).await.unwrap();
    assert!(recovered.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_update_keeps_published_results() {
    let session = SearchSession::spawn(SessionOptions::default()).unwrap();
    let version = session.replace_records(sample_listings()).await.unwrap();
    let before = session.wait_for_version(version).await.unwrap();

    let err = session
        .update_criteria(CriteriaUpdate::new().date_str("tomorrow"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Criteria(_)));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(session.view().executions, before.executions);
}

#[tokio::test]
async fn test_http_data_source_fetches_services() {
    let mut server = mockito::Server::new_async().await;
    let body = json!([
        create_test_listing("1", json!(100), 4.5, true, 12.97, 77.59),
        create_test_listing("2", json!("250"), 4.0, true, 12.98, 77.60),
    ]);
    let mock = server
        .mock("GET", "/services")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let source = HttpDataSource::new(server.url(), "/services", Duration::from_secs(5)).unwrap();
    let services = source.fetch_services().await.unwrap();

    mock.assert_async().await;
    assert_eq!(services.len(), 2);
    assert_eq!(services[1].base_price, Some(json!("250")));
}

#[tokio::test]
async fn test_http_data_source_surfaces_status_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/services")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let source = HttpDataSource::new(server.url(), "/services", Duration::from_secs(5)).unwrap();
    let err = source.fetch_services().await.unwrap_err();

    assert!(matches!(err, DataSourceError::ApiError(_)));
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let mut server = mockito::Server::new_async().await;
    let body = json!([
        create_test_listing("near", json!(100), 4.5, true, 0.0, 0.5),
        create_test_listing("far", json!(50), 4.8, true, 0.0, 1.0),
        { "serviceId": "pending", "status": "pending" },
        { "serviceId": "broken", "status": "accepted", "isOpen": true, "holidays": "{oops" },
    ]);
    let _mock = server
        .mock("GET", "/services")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;

    let options = SessionOptions {
        quiescence: Duration::from_millis(20),
        ..SessionOptions::default()
    };
    let session = SearchSession::spawn(options).unwrap();
    session
        .update_criteria(CriteriaUpdate::new().max_distance_km(Some(100.0)).date_str("2024-01-01"))
        .await
        .unwrap();

    let source = HttpDataSource::new(server.url(), "/services", Duration::from_secs(5)).unwrap();
    let version = session.load(&source, &StaticLocation::at(0.0, 0.0)).await.unwrap();
    let view = session.wait_for_version(version).await.unwrap();

    // "broken" has no position, so the active distance filter drops it
    assert_eq!(view.results.ids(), vec!["near"]);
    assert_eq!(view.results.total_candidates, 3);

    session.shutdown().await;
}
