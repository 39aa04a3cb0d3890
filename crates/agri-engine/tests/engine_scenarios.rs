//! End-to-end scenarios over the engine facade and an in-memory store

use agri_core::{AlertKind, DeviceStatus, Period, Reading, Severity};
use agri_engine::{Engine, EngineConfig, EngineError};
use agri_store::{MemoryStore, ReadingStore};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap()
}

fn reading(device_id: &str, ts: DateTime<Utc>) -> Reading {
    Reading {
        device_id: device_id.to_string(),
        timestamp: ts,
        temperature: None,
        humidity: None,
        rainfall: None,
        soil_moisture: None,
        wind_speed: None,
    }
}

async fn engine_with_store() -> (Engine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), EngineConfig::default());
    engine.register_device("d1", None, None).await.unwrap();
    (engine, store)
}

#[tokio::test]
async fn frosty_morning_with_dry_soil() {
    let (engine, store) = engine_with_store().await;

    let mut r = reading("d1", t0() + chrono::Duration::minutes(10));
    r.temperature = Some(-2.0);
    r.soil_moisture = Some(25.0);
    r.rainfall = Some(0.0);
    store.append(r).await.unwrap();

    let report = engine.poll_once().await;
    assert_eq!(report.readings_processed, 1);
    assert_eq!(report.alerts_emitted, 2);

    let summary = engine.list_alerts(Some("d1"), None, 20).await.unwrap();
    let kinds: Vec<_> = summary.alerts.iter().map(|a| a.kind).collect();
    assert!(kinds.contains(&AlertKind::Frost));
    assert!(kinds.contains(&AlertKind::LowSoilMoisture));
    assert!(summary.has_critical);
    assert!(summary.has_warnings);

    let frost = summary
        .alerts
        .iter()
        .find(|a| a.kind == AlertKind::Frost)
        .unwrap();
    assert_eq!(frost.severity, Severity::Critical);
    assert_eq!(frost.value, -2.0);

    // Dry soil and no rain: irrigation with a positive volume
    let rec = engine.irrigation("d1", "general").await.unwrap();
    assert!(rec.needs_irrigation);
    assert!(rec.suggested_water_amount_liters.unwrap() > 0.0);
}

#[tokio::test]
async fn continued_frost_stays_suppressed() {
    let (engine, store) = engine_with_store().await;

    let mut first = reading("d1", t0() + chrono::Duration::minutes(10));
    first.temperature = Some(-2.0);
    store.append(first).await.unwrap();
    engine.poll_once().await;

    let mut second = reading("d1", t0() + chrono::Duration::minutes(20));
    second.temperature = Some(-1.0);
    store.append(second).await.unwrap();

    let report = engine.poll_once().await;
    assert_eq!(report.readings_processed, 1);
    assert_eq!(report.alerts_emitted, 0);

    // Exactly one frost alert across both readings
    let summary = engine.list_alerts(Some("d1"), None, 20).await.unwrap();
    assert_eq!(summary.count, 1);

    // Alert state never bleeds into liveness: the device is online
    let status = engine
        .device_status("d1", t0() + chrono::Duration::minutes(25))
        .await
        .unwrap();
    assert_eq!(status.status, DeviceStatus::Online);
}

#[tokio::test]
async fn rain_overrides_low_moisture() {
    let (engine, store) = engine_with_store().await;

    let mut r = reading("d1", t0());
    r.soil_moisture = Some(20.0);
    r.rainfall = Some(5.0);
    store.append(r).await.unwrap();
    engine.poll_once().await;

    let rec = engine.irrigation("d1", "general").await.unwrap();
    assert!(!rec.needs_irrigation);
    assert_eq!(rec.suggested_water_amount_liters, None);
    assert!(rec.recommendation.to_lowercase().contains("rain"));
}

#[tokio::test]
async fn device_goes_offline_after_threshold() {
    let (engine, store) = engine_with_store().await;

    let seen = t0();
    store.append(reading("d1", seen)).await.unwrap();
    engine.poll_once().await;

    let status = engine
        .device_status("d1", seen + chrono::Duration::minutes(59))
        .await
        .unwrap();
    assert_eq!(status.status, DeviceStatus::Online);
    assert_eq!(status.last_seen, Some(seen));

    let status = engine
        .device_status("d1", seen + chrono::Duration::minutes(61))
        .await
        .unwrap();
    assert_eq!(status.status, DeviceStatus::Offline);
}

#[tokio::test]
async fn redelivered_reading_round_trip() {
    let (engine, store) = engine_with_store().await;

    let mut r = reading("d1", t0());
    r.temperature = Some(-3.0);
    store.append(r.clone()).await.unwrap();

    // The latest reading is exactly what was appended
    let current = engine.current("d1").await.unwrap();
    assert_eq!(current, r);

    engine.poll_once().await;

    // Same reading delivered again: no store duplicate, no new alert
    store.append(r.clone()).await.unwrap();
    let report = engine.poll_once().await;
    assert_eq!(report.readings_processed, 0);

    let history = engine.history("d1", None, None, 100).await.unwrap();
    assert_eq!(history.len(), 1);

    let summary = engine.list_alerts(Some("d1"), None, 20).await.unwrap();
    assert_eq!(summary.count, 1);
}

#[tokio::test]
async fn aggregation_over_a_day_of_readings() {
    let (engine, store) = engine_with_store().await;

    let now = Utc::now();
    for (hours_ago, temp, rain) in [(30i64, 99.0, 9.0), (20, 10.0, 1.0), (2, 20.0, 3.0)] {
        let mut r = reading("d1", now - chrono::Duration::hours(hours_ago));
        r.temperature = Some(temp);
        r.rainfall = Some(rain);
        store.append(r).await.unwrap();
    }

    let stat = engine.aggregated("d1", Period::Day).await.unwrap();

    // The 30-hours-old reading falls outside the day window
    assert_eq!(stat.readings_count, 2);
    let temp = stat.temperature.unwrap();
    assert_eq!(temp.min, 10.0);
    assert_eq!(temp.max, 20.0);
    assert_eq!(temp.avg, 15.0);
    let rain = stat.rainfall.unwrap();
    assert_eq!(rain.total, 4.0);
}

#[tokio::test]
async fn duplicate_registration_rejected() {
    let (engine, _) = engine_with_store().await;

    assert!(matches!(
        engine.register_device("d1", None, None).await,
        Err(EngineError::DuplicateDevice(_))
    ));
}
