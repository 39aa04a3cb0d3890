//! Windowed aggregation over stored readings

use crate::EngineResult;
use agri_core::{Accumulator, AggregatedStat, Period, Reading};
use agri_store::ReadingStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Computes on-demand aggregate statistics from the raw reading store
///
/// A pure function of the store at query time; nothing is cached or
/// written back.
#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn ReadingStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn ReadingStore>) -> Self {
        Self { store }
    }

    /// Aggregate a device's readings over `[now - span, now]`, both ends
    /// inclusive. An empty window yields absent stats and a zero count,
    /// not zeros.
    pub async fn aggregate(
        &self,
        device_id: &str,
        period: Period,
        now: DateTime<Utc>,
    ) -> EngineResult<AggregatedStat> {
        let since = now - period.span();
        let readings = self.store.list_readings(device_id, since, now).await?;
        Ok(fold_readings(device_id, period, &readings))
    }
}

fn fold_readings(device_id: &str, period: Period, readings: &[Reading]) -> AggregatedStat {
    let mut temperature = Accumulator::new();
    let mut humidity = Accumulator::new();
    let mut soil_moisture = Accumulator::new();
    let mut wind_speed = Accumulator::new();
    let mut rainfall = Accumulator::new();
    let mut readings_count = 0;

    for reading in readings {
        if !reading.has_any_metric() {
            continue;
        }
        readings_count += 1;
        temperature.add_opt(reading.temperature);
        humidity.add_opt(reading.humidity);
        soil_moisture.add_opt(reading.soil_moisture);
        wind_speed.add_opt(reading.wind_speed);
        rainfall.add_opt(reading.rainfall);
    }

    AggregatedStat {
        device_id: device_id.to_string(),
        period,
        temperature: temperature.metric_stats(),
        humidity: humidity.metric_stats(),
        soil_moisture: soil_moisture.metric_stats(),
        wind_speed: wind_speed.metric_stats(),
        rainfall: rainfall.rainfall_stats(),
        readings_count,
    }
}
