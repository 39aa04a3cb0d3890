//! Scheduled collection loop driving the registry and alert engine

use crate::{AlertEngine, DeviceRegistry};
use agri_store::ReadingStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Outcome of one poll iteration
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PollReport {
    pub devices_polled: usize,
    pub readings_processed: usize,
    pub alerts_emitted: usize,
    pub fetch_failures: usize,
}

/// Fetches new readings for every registered device on a fixed interval
///
/// Iterations are serialized by the cursor lock: a manual `poll_once`
/// overlapping the scheduled loop simply waits its turn. A fetch failure
/// for one device is logged and retried next cycle without touching the
/// others.
#[derive(Clone)]
pub struct Poller {
    store: Arc<dyn ReadingStore>,
    registry: DeviceRegistry,
    alerts: AlertEngine,
    interval: Duration,
    fetch_timeout: Duration,
    /// Per-device high-water mark of processed reading timestamps
    cursors: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl Poller {
    pub fn new(
        store: Arc<dyn ReadingStore>,
        registry: DeviceRegistry,
        alerts: AlertEngine,
        interval: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            alerts,
            interval,
            fetch_timeout,
            cursors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run one iteration over all registered devices
    pub async fn poll_once(&self, now: DateTime<Utc>) -> PollReport {
        let mut cursors = self.cursors.lock().await;
        let mut report = PollReport::default();

        for device_id in self.registry.device_ids().await {
            report.devices_polled += 1;

            let since = cursors
                .get(&device_id)
                .copied()
                .unwrap_or(DateTime::<Utc>::MIN_UTC);

            let fetched = tokio::time::timeout(
                self.fetch_timeout,
                self.store.list_readings(&device_id, since, now),
            )
            .await;

            let readings = match fetched {
                Ok(Ok(readings)) => readings,
                Ok(Err(e)) => {
                    warn!(device = %device_id, error = %e, "fetch failed - retrying next cycle");
                    report.fetch_failures += 1;
                    continue;
                }
                Err(_) => {
                    warn!(device = %device_id, "fetch timed out - retrying next cycle");
                    report.fetch_failures += 1;
                    continue;
                }
            };

            for reading in readings {
                // The fetch window is inclusive; skip anything already seen
                if cursors
                    .get(&device_id)
                    .map_or(false, |cursor| reading.timestamp <= *cursor)
                {
                    continue;
                }

                if let Err(e) = self.registry.touch(&device_id, reading.timestamp).await {
                    warn!(device = %device_id, error = %e, "touch failed");
                    continue;
                }

                let emitted = self.alerts.evaluate(&reading).await;
                report.alerts_emitted += emitted.len();
                report.readings_processed += 1;
                cursors.insert(device_id.clone(), reading.timestamp);
            }
        }

        debug!(
            devices = report.devices_polled,
            readings = report.readings_processed,
            alerts = report.alerts_emitted,
            failures = report.fetch_failures,
            "poll iteration finished"
        );

        report
    }

    /// Run the scheduled loop until the shutdown signal flips
    ///
    /// An iteration that overruns the interval is never cut off
    /// mid-device; the next tick fires immediately after it finishes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "poller started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.poll_once(Utc::now()).await;
                    info!(
                        devices = report.devices_polled,
                        readings = report.readings_processed,
                        alerts = report.alerts_emitted,
                        failures = report.fetch_failures,
                        "poll cycle complete"
                    );
                }
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("poller stopped");
    }
}
