//! Engine facade bundling the registry, alert, aggregation, advisor,
//! and poller components behind the contract the presentation layer
//! consumes.

use crate::{
    AlertEngine, AlertSummary, Aggregator, DeviceRegistry, DeviceStatusInfo, EngineError,
    EngineResult, IrrigationAdvisor, IrrigationConfig, PollReport, Poller, Thresholds,
};
use agri_core::{
    AggregatedStat, Device, IrrigationRecommendation, Location, Period, Reading, Severity,
};
use agri_store::ReadingStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Engine tuning knobs; every field has a production default
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seconds between poll iterations
    pub polling_interval: Duration,
    /// Bound on a single per-device store fetch
    pub fetch_timeout: Duration,
    /// A device with no reading for longer than this is offline
    pub offline_threshold: Duration,
    pub thresholds: Thresholds,
    pub irrigation: IrrigationConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
            offline_threshold: Duration::from_secs(3600),
            thresholds: Thresholds::default(),
            irrigation: IrrigationConfig::default(),
        }
    }
}

/// The telemetry alerting and analytics engine
///
/// Components share no hidden globals; the whole engine is constructed
/// from a store handle and a config, which keeps tests isolated.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn ReadingStore>,
    registry: DeviceRegistry,
    alerts: AlertEngine,
    aggregator: Aggregator,
    advisor: IrrigationAdvisor,
    poller: Poller,
}

impl Engine {
    pub fn new(store: Arc<dyn ReadingStore>, config: EngineConfig) -> Self {
        let offline_threshold = chrono::Duration::from_std(config.offline_threshold)
            .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        let registry = DeviceRegistry::new(offline_threshold);
        let alerts = AlertEngine::new(config.thresholds);
        let aggregator = Aggregator::new(store.clone());
        let advisor = IrrigationAdvisor::new(store.clone(), config.irrigation);
        let poller = Poller::new(
            store.clone(),
            registry.clone(),
            alerts.clone(),
            config.polling_interval,
            config.fetch_timeout,
        );

        Self {
            store,
            registry,
            alerts,
            aggregator,
            advisor,
            poller,
        }
    }

    pub async fn register_device(
        &self,
        device_id: &str,
        name: Option<String>,
        location: Option<Location>,
    ) -> EngineResult<Device> {
        self.registry.register(device_id, name, location).await
    }

    pub async fn list_devices(&self) -> Vec<Device> {
        self.registry.list().await
    }

    pub async fn device(&self, device_id: &str) -> EngineResult<Device> {
        self.registry.get(device_id).await
    }

    /// Connectivity status at `now`
    pub async fn device_status(
        &self,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<DeviceStatusInfo> {
        self.registry.status(device_id, now).await
    }

    /// Latest reading for a registered device
    pub async fn current(&self, device_id: &str) -> EngineResult<Reading> {
        self.registry.get(device_id).await?;
        self.store
            .latest_reading(device_id)
            .await?
            .ok_or_else(|| EngineError::NoData(device_id.to_string()))
    }

    /// Reading history, ascending, truncated to the most recent `limit`
    pub async fn history(
        &self,
        device_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> EngineResult<Vec<Reading>> {
        self.registry.get(device_id).await?;

        let since = from.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let until = to.unwrap_or_else(Utc::now);
        let mut readings = self.store.list_readings(device_id, since, until).await?;

        if readings.len() > limit {
            readings.drain(0..readings.len() - limit);
        }
        Ok(readings)
    }

    /// Stored alerts, optionally scoped to one device and severity
    pub async fn list_alerts(
        &self,
        device_id: Option<&str>,
        severity: Option<Severity>,
        limit: usize,
    ) -> EngineResult<AlertSummary> {
        if let Some(id) = device_id {
            self.registry.get(id).await?;
        }
        Ok(self.alerts.list(device_id, severity, limit).await)
    }

    /// Windowed aggregate statistics ending now
    pub async fn aggregated(
        &self,
        device_id: &str,
        period: Period,
    ) -> EngineResult<AggregatedStat> {
        self.aggregated_at(device_id, period, Utc::now()).await
    }

    /// Windowed aggregate statistics ending at an explicit instant
    pub async fn aggregated_at(
        &self,
        device_id: &str,
        period: Period,
        now: DateTime<Utc>,
    ) -> EngineResult<AggregatedStat> {
        self.registry.get(device_id).await?;
        self.aggregator.aggregate(device_id, period, now).await
    }

    /// Irrigation recommendation from the latest reading
    pub async fn irrigation(
        &self,
        device_id: &str,
        crop_type: &str,
    ) -> EngineResult<IrrigationRecommendation> {
        self.registry.get(device_id).await?;
        self.advisor.recommend(device_id, crop_type).await
    }

    /// Trigger one poll iteration synchronously
    pub async fn poll_once(&self) -> PollReport {
        self.poller.poll_once(Utc::now()).await
    }

    /// Run the scheduled poll loop until `shutdown` flips
    pub async fn run_poller(&self, shutdown: watch::Receiver<bool>) {
        self.poller.run(shutdown).await
    }
}
