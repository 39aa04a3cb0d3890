use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use std::str::FromStr;

use agri_core::{Location, Period, Severity};
use agri_engine::{Engine, EngineError};

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    engine: Engine,
}

pub fn build_app(engine: Engine) -> (Router, Arc<AppState>) {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter()
        .with_registry(registry.clone())
        .build()
        .expect("prom exporter");
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("agri-api");

    let requests_total = meter
        .u64_counter("agri_requests_total")
        .with_description("Total HTTP requests served")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        engine,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/health", get(api_health))
        .route("/api/devices", get(list_devices).post(register_device))
        .route("/api/devices/:device_id", get(get_device))
        .route("/api/devices/:device_id/current", get(get_current))
        .route("/api/devices/:device_id/history", get(get_history))
        .route("/api/devices/:device_id/status", get(get_status))
        .route("/api/devices/:device_id/alerts", get(get_device_alerts))
        .route("/api/alerts", get(get_all_alerts))
        .route("/api/analytics/aggregated", get(get_aggregated))
        .route("/api/analytics/irrigation", get(get_irrigation))
        .route("/api/poll", post(poll_once))
        .with_state(Arc::clone(&state));

    (router, state)
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

/// Map engine failures onto HTTP statuses; errors are surfaced as
/// explicit failures, never substituted with zeroed payloads.
fn error_response(err: EngineError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &err {
        EngineError::DuplicateDevice(_) => StatusCode::CONFLICT,
        EngineError::UnknownDevice(_) | EngineError::NoData(_) => StatusCode::NOT_FOUND,
        EngineError::Store(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

fn bad_request(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.requests_total.add(1, &[]);
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now(),
    }))
}

async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.requests_total.add(1, &[]);
    let devices = state.engine.list_devices().await;
    Json(serde_json::json!({
        "count": devices.len(),
        "devices": devices,
    }))
}

#[derive(Deserialize)]
struct RegisterRequest {
    device_id: Option<String>,
    name: Option<String>,
    location: Option<Location>,
}

async fn register_device(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let Some(device_id) = req.device_id else {
        return bad_request("device_id is required").into_response();
    };

    match state
        .engine
        .register_device(&device_id, req.name, req.location)
        .await
    {
        Ok(device) => (StatusCode::CREATED, Json(device)).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);
    match state.engine.device(&device_id).await {
        Ok(device) => Json(device).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_current(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);
    match state.engine.current(&device_id).await {
        Ok(reading) => Json(reading).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct HistoryQuery {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);
    let limit = q.limit.unwrap_or(100);
    match state.engine.history(&device_id, q.from, q.to, limit).await {
        Ok(readings) => Json(serde_json::json!({
            "device_id": device_id,
            "count": readings.len(),
            "readings": readings,
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);
    match state.engine.device_status(&device_id, Utc::now()).await {
        Ok(info) => Json(info).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct AlertsQuery {
    severity: Option<String>,
    limit: Option<usize>,
}

async fn get_device_alerts(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Query(q): Query<AlertsQuery>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let severity = match q.severity.as_deref().map(Severity::from_str).transpose() {
        Ok(severity) => severity,
        Err(e) => return bad_request(&e.to_string()).into_response(),
    };
    let limit = q.limit.unwrap_or(20);

    match state
        .engine
        .list_alerts(Some(&device_id), severity, limit)
        .await
    {
        Ok(summary) => Json(serde_json::json!({
            "device_id": device_id,
            "alerts": summary.alerts,
            "count": summary.count,
            "has_critical": summary.has_critical,
            "has_warnings": summary.has_warnings,
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn get_all_alerts(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AlertsQuery>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let severity = match q.severity.as_deref().map(Severity::from_str).transpose() {
        Ok(severity) => severity,
        Err(e) => return bad_request(&e.to_string()).into_response(),
    };
    let limit = q.limit.unwrap_or(50);

    match state.engine.list_alerts(None, severity, limit).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct AggregatedQuery {
    device_id: Option<String>,
    period: Option<String>,
}

async fn get_aggregated(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AggregatedQuery>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let Some(device_id) = q.device_id else {
        return bad_request("device_id parameter required").into_response();
    };
    let period = match q.period.as_deref().unwrap_or("day").parse::<Period>() {
        Ok(period) => period,
        Err(e) => return bad_request(&e.to_string()).into_response(),
    };

    match state.engine.aggregated(&device_id, period).await {
        Ok(stat) => Json(stat).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

#[derive(Deserialize)]
struct IrrigationQuery {
    device_id: Option<String>,
    crop_type: Option<String>,
}

async fn get_irrigation(
    State(state): State<Arc<AppState>>,
    Query(q): Query<IrrigationQuery>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let Some(device_id) = q.device_id else {
        return bad_request("device_id parameter required").into_response();
    };
    let crop_type = q.crop_type.unwrap_or_else(|| "general".to_string());

    match state.engine.irrigation(&device_id, &crop_type).await {
        Ok(recommendation) => Json(recommendation).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn poll_once(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.requests_total.add(1, &[]);
    let report = state.engine.poll_once().await;
    Json(report)
}
