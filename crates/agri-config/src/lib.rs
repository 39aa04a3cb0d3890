//! File-based configuration for the telemetry engine and daemon

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PollerConfig {
    /// Seconds between poll iterations (default 30)
    pub interval_secs: Option<u64>,
    /// Bound on a single per-device store fetch (default 10)
    pub fetch_timeout_secs: Option<u64>,
    /// Seconds without a reading before a device is offline (default 3600)
    pub offline_threshold_secs: Option<u64>,
}

/// Per-metric threshold overrides; unset fields keep the defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThresholdsConfig {
    pub frost_temp: Option<f64>,
    pub low_temp: Option<f64>,
    pub high_temp: Option<f64>,
    pub low_soil_moisture: Option<f64>,
    pub high_wind: Option<f64>,
    pub low_humidity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IrrigationFileConfig {
    /// Liters per percentage point of moisture deficit (default 0.5)
    pub area_coefficient: Option<f64>,
    /// Fractional volume increase in hot weather (default 0.2)
    pub heat_factor: Option<f64>,
    /// Soil-moisture floor per crop type (%)
    #[serde(default)]
    pub crop_floors: HashMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HttpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimulatorConfig {
    pub enabled: Option<bool>,
    /// Device ids to simulate
    #[serde(default)]
    pub devices: Vec<String>,
    /// Seconds between simulated readings (default 15)
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub poller: Option<PollerConfig>,
    pub thresholds: Option<ThresholdsConfig>,
    pub irrigation: Option<IrrigationFileConfig>,
    pub http: Option<HttpConfig>,
    pub simulator: Option<SimulatorConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load configuration from the AGRI_CONFIG path (TOML) if present,
    /// with reasonable defaults. Invalid values are fatal here, at
    /// startup, rather than surfacing at call time.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("AGRI_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let cfg = if Path::new(&path).exists() {
            let s = fs::read_to_string(&path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(poller) = &self.poller {
            if poller.interval_secs == Some(0) {
                return Err(ConfigError::Invalid("poller interval must be positive".into()));
            }
            if poller.fetch_timeout_secs == Some(0) {
                return Err(ConfigError::Invalid("fetch timeout must be positive".into()));
            }
        }

        let frost = self.frost_temp();
        let low = self.low_temp();
        let high = self.high_temp();
        if frost >= low {
            return Err(ConfigError::Invalid(format!(
                "frost_temp ({frost}) must be below low_temp ({low})"
            )));
        }
        if low >= high {
            return Err(ConfigError::Invalid(format!(
                "low_temp ({low}) must be below high_temp ({high})"
            )));
        }

        if let Some(irrigation) = &self.irrigation {
            if irrigation.area_coefficient.map_or(false, |c| c <= 0.0) {
                return Err(ConfigError::Invalid(
                    "area_coefficient must be positive".into(),
                ));
            }
            if irrigation.heat_factor.map_or(false, |f| f < 0.0) {
                return Err(ConfigError::Invalid(
                    "heat_factor must not be negative".into(),
                ));
            }
        }

        Ok(())
    }

    pub fn poll_interval_secs(&self) -> u64 {
        self.poller
            .as_ref()
            .and_then(|p| p.interval_secs)
            .unwrap_or(30)
    }

    pub fn fetch_timeout_secs(&self) -> u64 {
        self.poller
            .as_ref()
            .and_then(|p| p.fetch_timeout_secs)
            .unwrap_or(10)
    }

    pub fn offline_threshold_secs(&self) -> u64 {
        self.poller
            .as_ref()
            .and_then(|p| p.offline_threshold_secs)
            .unwrap_or(3600)
    }

    pub fn frost_temp(&self) -> f64 {
        self.thresholds
            .as_ref()
            .and_then(|t| t.frost_temp)
            .unwrap_or(0.0)
    }

    pub fn low_temp(&self) -> f64 {
        self.thresholds
            .as_ref()
            .and_then(|t| t.low_temp)
            .unwrap_or(5.0)
    }

    pub fn high_temp(&self) -> f64 {
        self.thresholds
            .as_ref()
            .and_then(|t| t.high_temp)
            .unwrap_or(35.0)
    }

    pub fn low_soil_moisture(&self) -> f64 {
        self.thresholds
            .as_ref()
            .and_then(|t| t.low_soil_moisture)
            .unwrap_or(30.0)
    }

    pub fn high_wind(&self) -> f64 {
        self.thresholds
            .as_ref()
            .and_then(|t| t.high_wind)
            .unwrap_or(40.0)
    }

    pub fn low_humidity(&self) -> f64 {
        self.thresholds
            .as_ref()
            .and_then(|t| t.low_humidity)
            .unwrap_or(20.0)
    }

    pub fn area_coefficient(&self) -> f64 {
        self.irrigation
            .as_ref()
            .and_then(|i| i.area_coefficient)
            .unwrap_or(0.5)
    }

    pub fn heat_factor(&self) -> f64 {
        self.irrigation
            .as_ref()
            .and_then(|i| i.heat_factor)
            .unwrap_or(0.2)
    }

    pub fn crop_floors(&self) -> HashMap<String, f64> {
        self.irrigation
            .as_ref()
            .map(|i| i.crop_floors.clone())
            .unwrap_or_default()
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }

    pub fn simulator_enabled(&self) -> bool {
        self.simulator
            .as_ref()
            .and_then(|s| s.enabled)
            .unwrap_or(false)
    }

    pub fn simulator_devices(&self) -> Vec<String> {
        self.simulator
            .as_ref()
            .map(|s| s.devices.clone())
            .unwrap_or_default()
    }

    pub fn simulator_interval_secs(&self) -> u64 {
        self.simulator
            .as_ref()
            .and_then(|s| s.interval_secs)
            .unwrap_or(15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.poll_interval_secs(), 30);
        assert_eq!(cfg.offline_threshold_secs(), 3600);
        assert_eq!(cfg.low_soil_moisture(), 30.0);
        assert_eq!(cfg.http_bind(), "0.0.0.0:8080");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn parse_overrides() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [poller]
            interval_secs = 60

            [thresholds]
            high_wind = 55.0

            [irrigation]
            area_coefficient = 0.8

            [irrigation.crop_floors]
            wheat = 35.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.poll_interval_secs(), 60);
        assert_eq!(cfg.high_wind(), 55.0);
        assert_eq!(cfg.area_coefficient(), 0.8);
        assert_eq!(cfg.crop_floors().get("wheat"), Some(&35.0));
        // Unset fields keep their defaults
        assert_eq!(cfg.frost_temp(), 0.0);
    }

    #[test]
    fn rejects_inverted_temperature_bands() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [thresholds]
            low_temp = -3.0
            "#,
        )
        .unwrap();

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_interval() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [poller]
            interval_secs = 0
            "#,
        )
        .unwrap();

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_coefficient() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [irrigation]
            area_coefficient = 0.0
            "#,
        )
        .unwrap();

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }
}
