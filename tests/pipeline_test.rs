mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;

use common::{refused_url, MockSource};
use sensorflow_etl::{etl::FetchError, EtlError, Extractor, MemoryStore, Pipeline};

fn pipeline(url: &str) -> Pipeline {
    Pipeline::new(Extractor::new(url, Duration::from_secs(5)).unwrap())
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[tokio::test]
async fn three_samples_produce_one_bucket_of_wind_statistics() {
    // ---
    let mock = MockSource::new(json!([
        {"timestamp": "2024-01-01T00:00:00", "wind_speed": 2.0, "power": null, "ambient_temperature": 20.0},
        {"timestamp": "2024-01-01T00:05:00", "wind_speed": 4.0, "power": null, "ambient_temperature": 21.0},
        {"timestamp": "2024-01-01T00:09:00", "wind_speed": 6.0, "power": null, "ambient_temperature": 22.0}
    ]));
    let url = mock.spawn().await;
    let mut store = MemoryStore::new();

    let report = pipeline(&url)
        .run_with_session("2024-01-01", &mut store)
        .await
        .unwrap();

    assert_eq!(report.extracted, 3);
    assert_eq!(report.transformed, 4);
    assert_eq!(report.loaded.rows_written, 4);

    let bucket = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let value = |name: &str| store.fact(bucket, store.signal_id(name).unwrap()).unwrap();
    assert_eq!(value("wind_speed_mean"), 4.0);
    assert_eq!(value("wind_speed_min"), 2.0);
    assert_eq!(value("wind_speed_max"), 6.0);
    assert!((value("wind_speed_std") - 2.0).abs() < 1e-9);

    let names: Vec<_> = store.signals().into_iter().map(|s| s.name).collect();
    assert!(names.iter().all(|n| n.starts_with("wind_speed_")));
}

#[tokio::test]
async fn extract_requests_one_day_with_projection() {
    // ---
    let mock = MockSource::new(json!([]));
    let url = mock.spawn().await;
    let mut store = MemoryStore::new();

    pipeline(&url)
        .run_with_session("2024-03-15", &mut store)
        .await
        .unwrap();

    assert_eq!(mock.hits(), 1);
    let query = mock.last_query().unwrap();
    assert_eq!(query["start_date"], "2024-03-15T00:00:00");
    assert_eq!(query["end_date"], "2024-03-15T23:59:59.999999");
    assert_eq!(query["columns"], "timestamp,wind_speed,power");
}

#[tokio::test]
async fn single_sample_bucket_has_no_std() {
    // ---
    let mock = MockSource::new(json!([
        {"timestamp": "2024-01-01 10:42:13", "wind_speed": 8.25, "power": 512.0}
    ]));
    let url = mock.spawn().await;
    let mut store = MemoryStore::new();

    pipeline(&url)
        .run_with_session("2024-01-01", &mut store)
        .await
        .unwrap();

    let bucket = Utc.with_ymd_and_hms(2024, 1, 1, 10, 40, 0).unwrap();
    for name in ["wind_speed_mean", "wind_speed_min", "wind_speed_max"] {
        assert_eq!(store.fact(bucket, store.signal_id(name).unwrap()), Some(8.25));
    }
    for name in ["power_mean", "power_min", "power_max"] {
        assert_eq!(store.fact(bucket, store.signal_id(name).unwrap()), Some(512.0));
    }
    assert_eq!(store.signal_id("wind_speed_std"), None);
    assert_eq!(store.signal_id("power_std"), None);
    assert_eq!(store.facts().len(), 6);
}

#[tokio::test]
async fn rerun_with_updated_source_overwrites_facts() {
    // ---
    let mock = MockSource::new(json!([
        {"timestamp": "2024-01-01T00:01:00", "wind_speed": 3.0, "power": 100.0}
    ]));
    let url = mock.spawn().await;
    let pipeline = pipeline(&url);
    let mut store = MemoryStore::new();

    pipeline.run_with_session("2024-01-01", &mut store).await.unwrap();
    let signals_after_first = store.signals();

    mock.set_body(json!([
        {"timestamp": "2024-01-01T00:01:00", "wind_speed": 5.0, "power": 100.0}
    ]));
    pipeline.run_with_session("2024-01-01", &mut store).await.unwrap();

    let bucket = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let id = store.signal_id("wind_speed_mean").unwrap();
    assert_eq!(store.fact(bucket, id), Some(5.0));
    assert_eq!(store.facts().iter().filter(|f| f.signal_id == id).count(), 1);
    assert_eq!(store.facts().len(), 6);
    assert_eq!(store.signals(), signals_after_first);
}

#[test]
fn malformed_date_is_rejected_before_any_io() {
    // ---
    tokio_test::block_on(async {
        let mock = MockSource::new(json!([]));
        let url = mock.spawn().await;
        let mut store = MemoryStore::new();

        let err = pipeline(&url)
            .run_with_session("2024-13-40", &mut store)
            .await
            .unwrap_err();

        assert!(matches!(err, EtlError::InvalidDate(_)));
        assert!(err.is_client_error());
        assert_eq!(mock.hits(), 0);
        assert_eq!(store.commits(), 0);
    });
}

#[tokio::test]
async fn malformed_date_is_rejected_before_connecting_to_target() {
    // ---
    let mock = MockSource::new(json!([]));
    let url = mock.spawn().await;

    let err = pipeline(&url)
        .run_owned("2024-13-40", "postgres://sensorflow@127.0.0.1:1/none")
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::InvalidDate(_)));
    assert_eq!(mock.hits(), 0);
}

#[tokio::test]
async fn empty_day_is_a_successful_no_op() {
    // ---
    for body in [json!([]), json!(null)] {
        let mock = MockSource::new(body);
        let url = mock.spawn().await;
        let mut store = MemoryStore::new();

        let report = pipeline(&url)
            .run_with_session("2024-01-01", &mut store)
            .await
            .unwrap();

        assert_eq!(report.extracted, 0);
        assert_eq!(report.loaded.rows_written, 0);
        assert_eq!(store.commits(), 0);
    }
}

#[tokio::test]
async fn source_error_status_fails_the_run() {
    // ---
    let mock = MockSource::new(json!({"detail": "boom"}));
    mock.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    let url = mock.spawn().await;
    let mut store = MemoryStore::new();

    let err = pipeline(&url)
        .run_with_session("2024-01-01", &mut store)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Extract(FetchError::Status(s)) if s.as_u16() == 500));
    assert!(!err.is_client_error());
    assert_eq!(mock.hits(), 1);
    assert_eq!(store.commits(), 0);
}

#[tokio::test]
async fn non_array_body_fails_the_run() {
    // ---
    let mock = MockSource::new(json!({"rows": []}));
    let url = mock.spawn().await;
    let mut store = MemoryStore::new();

    let err = pipeline(&url)
        .run_with_session("2024-01-01", &mut store)
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Extract(FetchError::UnexpectedBody(_))));
    assert!(store.facts().is_empty());
}

#[tokio::test]
async fn extract_timeout_degrades_to_empty_day() {
    // ---
    let mock = MockSource::new(json!([
        {"timestamp": "2024-01-01T00:00:00", "wind_speed": 1.0, "power": 1.0}
    ]));
    mock.set_delay(Duration::from_secs(3));
    let url = mock.spawn().await;

    let extractor = Extractor::new(url, Duration::from_millis(200)).unwrap();
    let rows = extractor.extract(day()).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(mock.hits(), 1);
}

#[tokio::test]
async fn unreachable_source_degrades_to_empty_day() {
    // ---
    let extractor = Extractor::new(refused_url().await, Duration::from_secs(2)).unwrap();
    assert!(extractor.extract(day()).await.unwrap().is_empty());
}

#[tokio::test]
async fn extract_normalizes_and_sorts_timestamps() {
    // ---
    let mock = MockSource::new(json!([
        {"timestamp": "2024-01-01T00:20:00Z", "wind_speed": 3.0, "power": 30.0},
        {"timestamp": "2024-01-01 00:10:00", "wind_speed": 2.0, "power": 20.0},
        {"timestamp": "not a time", "wind_speed": 9.0, "power": 90.0},
        {"timestamp": "2024-01-01T01:00:00+01:00", "wind_speed": 1.0, "power": 10.0}
    ]));
    let url = mock.spawn().await;

    let extractor = Extractor::new(url, Duration::from_secs(5)).unwrap();
    let rows = extractor.extract(day()).await.unwrap();

    let stamps: Vec<_> = rows.iter().map(|r| r.timestamp).collect();
    assert_eq!(
        stamps,
        vec![
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 20, 0).unwrap(),
        ]
    );
    assert_eq!(rows[0].wind_speed, Some(1.0));
}
