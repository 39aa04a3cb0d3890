//! Simulated field device for testing

use crate::{IngestError, IngestResult, SensorDriver};
use agri_core::Reading;
use chrono::{Timelike, Utc};
use tokio::time::{sleep, Duration};

/// Simulator driver that generates synthetic environmental readings
///
/// Values follow a daily temperature cycle with humidity running inverse
/// to it, occasional rain events recharging soil moisture, and
/// evaporation drawing it back down. Variation is derived from the clock
/// rather than a random source, keeping runs reproducible second to
/// second.
pub struct SimulatorDriver {
    device_id: String,
    interval: u64,
    active: bool,
    temperature: f64,
    humidity: f64,
    rainfall: f64,
    soil_moisture: f64,
    wind_speed: f64,
}

impl SimulatorDriver {
    /// Create a new simulator emitting one reading per `interval` seconds
    pub fn new(device_id: impl Into<String>, interval: u64) -> Self {
        Self {
            device_id: device_id.into(),
            interval,
            active: false,
            temperature: 20.0,
            humidity: 55.0,
            rainfall: 0.0,
            soil_moisture: 45.0,
            wind_speed: 8.0,
        }
    }

    fn generate_reading(&mut self) -> Reading {
        let now = Utc::now();
        let hour = now.hour() as f64;
        let seed = now.timestamp();
        let variation = ((seed % 100) as f64 / 10.0) - 5.0;

        // Daily cycle: coolest overnight, peaking mid-afternoon
        let daily_base = 20.0 + 10.0 * (0.5 - ((hour - 12.0) / 12.0).abs());
        self.temperature = (daily_base + variation * 0.3).clamp(-10.0, 40.0);

        // Humidity runs inverse to temperature, higher overnight
        let mut humidity_base = 60.0 - (self.temperature - 20.0) * 1.5;
        if hour < 6.0 {
            humidity_base += 15.0;
        }
        self.humidity = (humidity_base + variation).clamp(20.0, 100.0);

        // Occasional rain events, decaying between them
        if seed % 19 == 0 {
            self.rainfall = 1.0 + (seed % 14) as f64;
        } else {
            self.rainfall = (self.rainfall - 0.5).max(0.0);
        }

        // Soil moisture recharges with rain, dries faster in heat
        if self.rainfall > 0.0 {
            self.soil_moisture = (self.soil_moisture + self.rainfall * 0.4).min(100.0);
        } else {
            let evaporation = (0.5 + (self.temperature - 20.0) * 0.1).max(0.0);
            self.soil_moisture = (self.soil_moisture - evaporation).max(0.0);
        }

        // Wind picks up during the day, with the odd gust
        let wind_base = 5.0 + (hour - 12.0).powi(2) * 0.05;
        let gust = if seed % 23 == 0 { 10.0 } else { 0.0 };
        self.wind_speed = (wind_base + variation.abs() + gust).clamp(0.0, 50.0);

        Reading {
            device_id: self.device_id.clone(),
            timestamp: now,
            temperature: Some(round2(self.temperature)),
            humidity: Some(round2(self.humidity)),
            rainfall: Some(round2(self.rainfall)),
            soil_moisture: Some(round2(self.soil_moisture)),
            wind_speed: Some(round2(self.wind_speed)),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[async_trait::async_trait]
impl SensorDriver for SimulatorDriver {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn start(&mut self) -> IngestResult<()> {
        if self.active {
            return Err(IngestError::DriverError(
                "Driver already started".to_string(),
            ));
        }
        self.active = true;
        tracing::info!(
            device = %self.device_id,
            interval_secs = self.interval,
            "simulator driver started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> IngestResult<()> {
        if !self.active {
            return Err(IngestError::DriverError("Driver not started".to_string()));
        }
        self.active = false;
        tracing::info!(device = %self.device_id, "simulator driver stopped");
        Ok(())
    }

    async fn next_reading(&mut self) -> IngestResult<Reading> {
        if !self.active {
            return Err(IngestError::DriverError("Driver not active".to_string()));
        }

        sleep(Duration::from_secs(self.interval)).await;

        Ok(self.generate_reading())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
