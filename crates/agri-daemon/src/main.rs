//! AgriWeather daemon - poller, simulator ingest, and HTTP API
//!
//! This binary coordinates:
//! - Simulated device ingestion into the raw reading store
//! - The scheduled poll loop (liveness + alerting)
//! - The HTTP presentation layer

mod config;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use agri_config::AppConfig;
use agri_engine::Engine;
use agri_ingest::{SensorDriver, SimulatorDriver};
use agri_store::{MemoryStore, ReadingStore};

use crate::config::DaemonConfig;

#[tokio::main]
async fn main() -> Result<()> {
    agri_obs::init("agrid");

    let file_config = AppConfig::load().context("Failed to load configuration file")?;
    let config = DaemonConfig::from_env(&file_config)?;
    info!(
        polling_interval = config.polling_interval,
        offline_threshold = config.offline_threshold,
        sim_devices = config.sim_devices.len(),
        "Loaded configuration"
    );

    let store = Arc::new(MemoryStore::new());
    let engine = Engine::new(store.clone(), config.engine_config());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Register and start simulated devices
    let mut ingest_handles = Vec::new();
    for device_id in &config.sim_devices {
        engine
            .register_device(device_id, None, None)
            .await
            .with_context(|| format!("Failed to register simulated device {device_id}"))?;
        ingest_handles.push(spawn_simulator(
            store.clone(),
            device_id.clone(),
            config.sim_interval,
            shutdown_rx.clone(),
        ));
    }

    // Scheduled poll loop
    let poller_engine = engine.clone();
    let poller_shutdown = shutdown_rx.clone();
    let poller_handle =
        tokio::spawn(async move { poller_engine.run_poller(poller_shutdown).await });

    // HTTP server
    let (app, state) = agri_api::build_app(engine);
    let addr: SocketAddr = config
        .http_bind
        .parse()
        .context("Invalid HTTP bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind TCP listener")?;

    // Mark ready just before serving
    agri_api::set_ready(&state, true);
    info!(%addr, "HTTP server listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    // Stop background tasks; in-flight work finishes, nothing is retried
    let _ = shutdown_tx.send(true);
    let _ = poller_handle.await;
    for handle in ingest_handles {
        let _ = handle.await;
    }

    info!("agrid stopped");
    Ok(())
}

/// Feed one simulated device into the raw store until shutdown
fn spawn_simulator(
    store: Arc<MemoryStore>,
    device_id: String,
    interval: u64,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut driver = SimulatorDriver::new(device_id.clone(), interval);
        if let Err(e) = driver.start().await {
            error!(device = %device_id, error = %e, "Failed to start simulator driver");
            return;
        }

        loop {
            tokio::select! {
                result = driver.next_reading() => match result {
                    Ok(reading) => {
                        if let Err(e) = store.append(reading).await {
                            warn!(device = %device_id, error = %e, "Failed to store reading");
                        }
                    }
                    Err(e) => {
                        warn!(device = %device_id, error = %e, "Simulator read failed");
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Err(e) = driver.stop().await {
            warn!(device = %device_id, error = %e, "Error stopping simulator driver");
        }
    })
}
