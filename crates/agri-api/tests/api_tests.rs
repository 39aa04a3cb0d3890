use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tower::ServiceExt;

use agri_core::Reading;
use agri_engine::{Engine, EngineConfig};
use agri_store::{MemoryStore, ReadingStore};

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), EngineConfig::default());
    let (app, _state) = agri_api::build_app(engine);
    (app, store)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn reading(device_id: &str, minutes_ago: i64) -> Reading {
    Reading {
        device_id: device_id.to_string(),
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
        temperature: None,
        humidity: None,
        rainfall: None,
        soil_moisture: None,
        wind_speed: None,
    }
}

#[tokio::test]
async fn register_and_list_devices() {
    let (app, _store) = test_app();

    let (status, body) = post_json(
        &app,
        "/api/devices",
        serde_json::json!({
            "device_id": "field-a-001",
            "name": "Field A Sensor",
            "location": {"latitude": 50.0, "longitude": 20.0}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["device_id"], "field-a-001");
    assert_eq!(body["name"], "Field A Sensor");

    // Duplicate id is a conflict
    let (status, _) = post_json(
        &app,
        "/api/devices",
        serde_json::json!({"device_id": "field-a-001"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Missing id is a bad request
    let (status, _) = post_json(&app, "/api/devices", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get_json(&app, "/api/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn poll_status_and_alerts_flow() {
    let (app, store) = test_app();

    post_json(&app, "/api/devices", serde_json::json!({"device_id": "d1"})).await;

    let mut r = reading("d1", 5);
    r.temperature = Some(-2.0);
    r.soil_moisture = Some(25.0);
    store.append(r).await.unwrap();

    let (status, report) = post_json(&app, "/api/poll", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["readings_processed"], 1);
    assert_eq!(report["alerts_emitted"], 2);

    let (status, body) = get_json(&app, "/api/devices/d1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "online");

    let (status, body) = get_json(&app, "/api/devices/d1/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["has_critical"], true);
    assert_eq!(body["has_warnings"], true);

    // Severity filter narrows the listing
    let (status, body) = get_json(&app, "/api/devices/d1/alerts?severity=critical").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["alerts"][0]["kind"], "frost");

    let (status, body) = get_json(&app, "/api/alerts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn aggregated_analytics() {
    let (app, store) = test_app();
    post_json(&app, "/api/devices", serde_json::json!({"device_id": "d1"})).await;

    for (minutes_ago, temp) in [(50i64, 10.0), (30, 20.0), (10, 30.0)] {
        let mut r = reading("d1", minutes_ago);
        r.temperature = Some(temp);
        store.append(r).await.unwrap();
    }

    let (status, body) = get_json(&app, "/api/analytics/aggregated?device_id=d1&period=hour").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["readings_count"], 3);
    assert_eq!(body["temperature"]["min"], 10.0);
    assert_eq!(body["temperature"]["max"], 30.0);
    assert_eq!(body["temperature"]["avg"], 20.0);
    // No rainfall was reported; the field is absent, not zero
    assert!(body.get("rainfall").is_none());

    let (status, _) = get_json(&app, "/api/analytics/aggregated?device_id=d1&period=decade").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/analytics/aggregated").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_json(&app, "/api/analytics/aggregated?device_id=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn irrigation_analytics() {
    let (app, store) = test_app();
    post_json(&app, "/api/devices", serde_json::json!({"device_id": "d1"})).await;

    // No readings yet: explicit no-data failure
    let (status, _) = get_json(&app, "/api/analytics/irrigation?device_id=d1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut r = reading("d1", 1);
    r.soil_moisture = Some(25.0);
    r.rainfall = Some(0.0);
    r.temperature = Some(20.0);
    store.append(r).await.unwrap();

    let (status, body) = get_json(&app, "/api/analytics/irrigation?device_id=d1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["needs_irrigation"], true);
    assert_eq!(body["crop_type"], "general");
    assert!(body["suggested_water_amount_liters"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn current_and_history() {
    let (app, store) = test_app();
    post_json(&app, "/api/devices", serde_json::json!({"device_id": "d1"})).await;

    let (status, _) = get_json(&app, "/api/devices/d1/current").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut r = reading("d1", 2);
    r.temperature = Some(21.5);
    store.append(r).await.unwrap();

    let (status, body) = get_json(&app, "/api/devices/d1/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["temperature"], 21.5);

    let (status, body) = get_json(&app, "/api/devices/d1/history?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, _) = get_json(&app, "/api/devices/ghost/history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_readiness() {
    let (app, _store) = test_app();

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Not marked ready yet
    let res = app
        .clone()
        .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}
