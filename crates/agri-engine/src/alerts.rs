//! Threshold evaluation and alert deduplication

use agri_core::{Alert, AlertKind, Reading, Severity};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Alerts retained per device; older entries are dropped
const MAX_ALERTS_PER_DEVICE: usize = 50;

/// Static threshold configuration (°C, %, km/h)
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Below this temperature: frost (critical)
    pub frost_temp: f64,
    /// Below this temperature (and not frost): low_temp (warning)
    pub low_temp: f64,
    /// Above this temperature: high_temp (warning)
    pub high_temp: f64,
    /// Below this soil moisture: low_soil_moisture (warning)
    pub low_soil_moisture: f64,
    /// Above this wind speed: high_wind (warning)
    pub high_wind: f64,
    /// Below this humidity: low_humidity (info)
    pub low_humidity: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            frost_temp: 0.0,
            low_temp: 5.0,
            high_temp: 35.0,
            low_soil_moisture: 30.0,
            high_wind: 40.0,
            low_humidity: 20.0,
        }
    }
}

/// Alert listing plus severity rollup flags for banner styling
#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub alerts: Vec<Alert>,
    pub count: usize,
    pub has_critical: bool,
    pub has_warnings: bool,
}

/// Outcome of one threshold rule against one reading
enum RuleOutcome {
    /// Input metric missing: no transition in either direction
    Indeterminate,
    /// Condition observed false: active flag clears silently
    Clear,
    /// Condition observed true
    Fire {
        severity: Severity,
        value: f64,
        message: String,
    },
}

struct AlertState {
    /// Conditions currently active, suppressing repeat alerts
    active: HashSet<(String, AlertKind)>,
    history: HashMap<String, VecDeque<Alert>>,
}

/// Evaluates readings against threshold rules and deduplicates alerts
///
/// Suppression is an explicit state machine per `(device, kind)`:
/// inactive→active emits one alert, active→active emits nothing,
/// active→inactive clears silently.
#[derive(Clone)]
pub struct AlertEngine {
    thresholds: Thresholds,
    state: Arc<RwLock<AlertState>>,
}

impl AlertEngine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: Arc::new(RwLock::new(AlertState {
                active: HashSet::new(),
                history: HashMap::new(),
            })),
        }
    }

    /// Evaluate one reading, returning the newly emitted alerts
    pub async fn evaluate(&self, reading: &Reading) -> Vec<Alert> {
        let outcomes = check_rules(&self.thresholds, reading);

        let mut state = self.state.write().await;
        let mut emitted = Vec::new();

        for (kind, outcome) in outcomes {
            let key = (reading.device_id.clone(), kind);
            match outcome {
                RuleOutcome::Indeterminate => {}
                RuleOutcome::Clear => {
                    state.active.remove(&key);
                }
                RuleOutcome::Fire {
                    severity,
                    value,
                    message,
                } => {
                    if !state.active.insert(key) {
                        // Condition already active: suppressed
                        continue;
                    }
                    emitted.push(Alert {
                        device_id: reading.device_id.clone(),
                        timestamp: reading.timestamp,
                        kind,
                        severity,
                        message,
                        value,
                    });
                }
            }
        }

        if !emitted.is_empty() {
            let history = state.history.entry(reading.device_id.clone()).or_default();
            for alert in &emitted {
                info!(
                    device = %alert.device_id,
                    kind = ?alert.kind,
                    severity = ?alert.severity,
                    "{}",
                    alert.message
                );
                if history.len() >= MAX_ALERTS_PER_DEVICE {
                    history.pop_front();
                }
                history.push_back(alert.clone());
            }
        }

        emitted
    }

    /// List stored alerts, optionally filtered by device and severity.
    ///
    /// Per-device listings keep chronological order and return the most
    /// recent `limit` entries; cross-device listings are newest-first.
    pub async fn list(
        &self,
        device_id: Option<&str>,
        severity: Option<Severity>,
        limit: usize,
    ) -> AlertSummary {
        let state = self.state.read().await;

        let mut alerts: Vec<Alert> = match device_id {
            Some(id) => state
                .history
                .get(id)
                .map(|h| h.iter().cloned().collect())
                .unwrap_or_default(),
            None => {
                let mut all: Vec<Alert> = state
                    .history
                    .values()
                    .flat_map(|h| h.iter().cloned())
                    .collect();
                all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                all
            }
        };

        if let Some(severity) = severity {
            alerts.retain(|a| a.severity == severity);
        }

        if alerts.len() > limit {
            match device_id {
                // Per-device: keep the most recent tail
                Some(_) => {
                    alerts.drain(0..alerts.len() - limit);
                }
                // Cross-device (newest-first): keep the head
                None => alerts.truncate(limit),
            }
        }

        let has_critical = alerts.iter().any(|a| a.severity == Severity::Critical);
        let has_warnings = alerts.iter().any(|a| a.severity == Severity::Warning);

        AlertSummary {
            count: alerts.len(),
            has_critical,
            has_warnings,
            alerts,
        }
    }
}

fn check_rules(thresholds: &Thresholds, reading: &Reading) -> Vec<(AlertKind, RuleOutcome)> {
    let mut outcomes = Vec::with_capacity(6);

    match reading.temperature {
        Some(t) => {
            outcomes.push((
                AlertKind::Frost,
                if t < thresholds.frost_temp {
                    RuleOutcome::Fire {
                        severity: Severity::Critical,
                        value: t,
                        message: format!(
                            "Frost warning! Temperature is {t:.1}°C. Protect your crops immediately."
                        ),
                    }
                } else {
                    RuleOutcome::Clear
                },
            ));
            outcomes.push((
                AlertKind::LowTemp,
                if t >= thresholds.frost_temp && t < thresholds.low_temp {
                    RuleOutcome::Fire {
                        severity: Severity::Warning,
                        value: t,
                        message: format!("Low temperature alert: {t:.1}°C. Monitor for frost risk."),
                    }
                } else {
                    RuleOutcome::Clear
                },
            ));
            outcomes.push((
                AlertKind::HighTemp,
                if t > thresholds.high_temp {
                    RuleOutcome::Fire {
                        severity: Severity::Warning,
                        value: t,
                        message: format!(
                            "High temperature warning: {t:.1}°C. Crops may experience heat stress."
                        ),
                    }
                } else {
                    RuleOutcome::Clear
                },
            ));
        }
        None => {
            outcomes.push((AlertKind::Frost, RuleOutcome::Indeterminate));
            outcomes.push((AlertKind::LowTemp, RuleOutcome::Indeterminate));
            outcomes.push((AlertKind::HighTemp, RuleOutcome::Indeterminate));
        }
    }

    outcomes.push((
        AlertKind::LowSoilMoisture,
        match reading.soil_moisture {
            Some(m) if m < thresholds.low_soil_moisture => RuleOutcome::Fire {
                severity: Severity::Warning,
                value: m,
                message: format!("Low soil moisture: {m:.1}%. Irrigation recommended."),
            },
            Some(_) => RuleOutcome::Clear,
            None => RuleOutcome::Indeterminate,
        },
    ));

    outcomes.push((
        AlertKind::HighWind,
        match reading.wind_speed {
            Some(w) if w > thresholds.high_wind => RuleOutcome::Fire {
                severity: Severity::Warning,
                value: w,
                message: format!("High wind warning: {w:.1} km/h. Potential crop damage risk."),
            },
            Some(_) => RuleOutcome::Clear,
            None => RuleOutcome::Indeterminate,
        },
    ));

    outcomes.push((
        AlertKind::LowHumidity,
        match reading.humidity {
            Some(h) if h < thresholds.low_humidity => RuleOutcome::Fire {
                severity: Severity::Info,
                value: h,
                message: format!("Low humidity: {h:.1}%. Increased water loss risk."),
            },
            Some(_) => RuleOutcome::Clear,
            None => RuleOutcome::Indeterminate,
        },
    ));

    outcomes
}
