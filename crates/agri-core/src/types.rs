//! Core data types for field telemetry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic position of a field device
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            latitude: 50.0,
            longitude: 20.0,
        }
    }
}

/// A registered field device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub device_id: String,

    pub name: String,

    pub location: Location,

    /// When the device was registered
    pub registered_at: DateTime<Utc>,

    /// Timestamp of the most recent reading observed by the poller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Connectivity status, derived from `last_seen` at read time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

/// One timestamped sensor sample from a device
///
/// A missing field means the sensor did not report that metric. Absent
/// values stay absent through aggregation and threshold checks; they are
/// never coerced to zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub device_id: String,

    pub timestamp: DateTime<Utc>,

    /// Air temperature (°C)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Relative humidity (%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Rainfall rate (mm/h)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,

    /// Soil moisture (%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,

    /// Wind speed (km/h)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
}

impl Reading {
    /// True if the reading carries at least one reported metric
    pub fn has_any_metric(&self) -> bool {
        self.temperature.is_some()
            || self.humidity.is_some()
            || self.rainfall.is_some()
            || self.soil_moisture.is_some()
            || self.wind_speed.is_some()
    }
}

/// Threshold condition that triggered an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Frost,
    LowTemp,
    HighTemp,
    LowSoilMoisture,
    HighWind,
    LowHumidity,
}

/// Alert severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl std::str::FromStr for Severity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(ParseEnumError::new("severity", other)),
        }
    }
}

/// An emitted alert event
///
/// Alerts are append-only; `timestamp` is the timestamp of the reading
/// that triggered the condition, not the wall clock at evaluation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    /// The measured quantity that triggered the condition
    pub value: f64,
}

/// Aggregation window selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
    Week,
    Month,
}

impl Period {
    /// Length of the window, counted back from `now`
    pub fn span(&self) -> chrono::Duration {
        match self {
            Period::Hour => chrono::Duration::hours(1),
            Period::Day => chrono::Duration::hours(24),
            Period::Week => chrono::Duration::days(7),
            Period::Month => chrono::Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour => "hour",
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

impl std::str::FromStr for Period {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Period::Hour),
            "day" => Ok(Period::Day),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            other => Err(ParseEnumError::new("period", other)),
        }
    }
}

/// Failed to parse an enumerated query value
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {what}: {value}")]
pub struct ParseEnumError {
    what: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

/// Min/max/mean summary for one metric over a window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Accumulated rainfall summary over a window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RainfallStats {
    /// Summed rainfall over the window (mm)
    pub total: f64,
    /// Mean rate over the contributing readings (mm/h)
    pub avg: f64,
}

/// Windowed aggregate statistics for one device
///
/// A metric with no reported samples in the window is `None`; it never
/// shows up as a zero that reads like a real measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedStat {
    pub device_id: String,
    pub period: Period,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<MetricStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<MetricStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<MetricStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<MetricStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<RainfallStats>,

    /// Readings in the window that reported at least one metric
    pub readings_count: usize,
}

/// Snapshot of the latest reading used for an irrigation decision
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct CurrentConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
}

impl From<&Reading> for CurrentConditions {
    fn from(reading: &Reading) -> Self {
        Self {
            soil_moisture: reading.soil_moisture,
            temperature: reading.temperature,
            rainfall: reading.rainfall,
            humidity: reading.humidity,
        }
    }
}

/// Watering guidance derived from the latest reading and a crop profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrrigationRecommendation {
    pub device_id: String,
    pub crop_type: String,
    pub current_conditions: CurrentConditions,
    pub needs_irrigation: bool,
    /// Human-readable rationale naming the deciding factor
    pub recommendation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_water_amount_liters: Option<f64>,
}
