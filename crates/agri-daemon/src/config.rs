//! Daemon configuration: environment variables over the TOML file

use agri_config::AppConfig;
use agri_engine::{EngineConfig, IrrigationConfig, Thresholds};
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Seconds between poll iterations (default: 30)
    pub polling_interval: u64,

    /// Seconds without a reading before a device is offline (default: 3600)
    pub offline_threshold: u64,

    /// Bound on a single per-device store fetch in seconds (default: 10)
    pub fetch_timeout: u64,

    /// Liters per percentage point of moisture deficit (default: 0.5)
    pub area_coefficient: f64,

    /// HTTP bind address
    pub http_bind: String,

    /// Device ids fed by the built-in simulator; empty disables it
    pub sim_devices: Vec<String>,

    /// Seconds between simulated readings (default: 15)
    pub sim_interval: u64,

    file: AppConfig,
}

impl DaemonConfig {
    /// Resolve configuration: environment variables win over the TOML
    /// file, which wins over built-in defaults.
    pub fn from_env(file: &AppConfig) -> Result<Self> {
        let polling_interval = env::var("POLLING_INTERVAL")
            .unwrap_or_else(|_| file.poll_interval_secs().to_string())
            .parse()
            .context("Invalid POLLING_INTERVAL")?;

        let offline_threshold = env::var("OFFLINE_THRESHOLD")
            .unwrap_or_else(|_| file.offline_threshold_secs().to_string())
            .parse()
            .context("Invalid OFFLINE_THRESHOLD")?;

        let fetch_timeout = env::var("FETCH_TIMEOUT")
            .unwrap_or_else(|_| file.fetch_timeout_secs().to_string())
            .parse()
            .context("Invalid FETCH_TIMEOUT")?;

        let area_coefficient = env::var("AREA_COEFFICIENT")
            .unwrap_or_else(|_| file.area_coefficient().to_string())
            .parse()
            .context("Invalid AREA_COEFFICIENT")?;

        let http_bind = env::var("HTTP_BIND").unwrap_or_else(|_| file.http_bind());

        let sim_devices = match env::var("SIM_DEVICES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => {
                let from_file = file.simulator_devices();
                if !from_file.is_empty() {
                    from_file
                } else {
                    vec!["agriweather-device-001".to_string()]
                }
            }
        };

        let sim_interval = env::var("SIM_INTERVAL")
            .unwrap_or_else(|_| file.simulator_interval_secs().to_string())
            .parse()
            .context("Invalid SIM_INTERVAL")?;

        Ok(Self {
            polling_interval,
            offline_threshold,
            fetch_timeout,
            area_coefficient,
            http_bind,
            sim_devices,
            sim_interval,
            file: file.clone(),
        })
    }

    /// Engine tuning assembled from the resolved sources
    pub fn engine_config(&self) -> EngineConfig {
        let thresholds = Thresholds {
            frost_temp: self.file.frost_temp(),
            low_temp: self.file.low_temp(),
            high_temp: self.file.high_temp(),
            low_soil_moisture: self.file.low_soil_moisture(),
            high_wind: self.file.high_wind(),
            low_humidity: self.file.low_humidity(),
        };

        let mut irrigation = IrrigationConfig {
            area_coefficient: self.area_coefficient,
            heat_factor: self.file.heat_factor(),
            ..IrrigationConfig::default()
        };
        // File entries override the built-in crop table
        irrigation.crop_floors.extend(self.file.crop_floors());

        EngineConfig {
            polling_interval: Duration::from_secs(self.polling_interval),
            fetch_timeout: Duration::from_secs(self.fetch_timeout),
            offline_threshold: Duration::from_secs(self.offline_threshold),
            thresholds,
            irrigation,
        }
    }
}
