//! Registered device tracking and liveness

use crate::{EngineError, EngineResult};
use agri_core::{Device, DeviceStatus, Location};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connectivity snapshot for one device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusInfo {
    pub device_id: String,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    pub registered: DateTime<Utc>,
}

/// Registry of known devices
///
/// `status` is a pure function of `last_seen` and the caller's clock,
/// recomputed on every read. The device map sits behind a single lock so
/// a `touch` is atomic with respect to status reads.
#[derive(Clone)]
pub struct DeviceRegistry {
    devices: Arc<RwLock<HashMap<String, Device>>>,
    offline_threshold: chrono::Duration,
}

impl DeviceRegistry {
    pub fn new(offline_threshold: chrono::Duration) -> Self {
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            offline_threshold,
        }
    }

    /// Register a new device. The name defaults to `Device <id>` and the
    /// location to the configured default site when omitted.
    pub async fn register(
        &self,
        device_id: &str,
        name: Option<String>,
        location: Option<Location>,
    ) -> EngineResult<Device> {
        let mut devices = self.devices.write().await;
        if devices.contains_key(device_id) {
            return Err(EngineError::DuplicateDevice(device_id.to_string()));
        }

        let device = Device {
            device_id: device_id.to_string(),
            name: name.unwrap_or_else(|| format!("Device {device_id}")),
            location: location.unwrap_or_default(),
            registered_at: Utc::now(),
            last_seen: None,
        };
        devices.insert(device_id.to_string(), device.clone());
        Ok(device)
    }

    pub async fn get(&self, device_id: &str) -> EngineResult<Device> {
        let devices = self.devices.read().await;
        devices
            .get(device_id)
            .cloned()
            .ok_or_else(|| EngineError::UnknownDevice(device_id.to_string()))
    }

    /// All registered devices, ordered by id
    pub async fn list(&self) -> Vec<Device> {
        let devices = self.devices.read().await;
        let mut all: Vec<_> = devices.values().cloned().collect();
        all.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        all
    }

    pub async fn device_ids(&self) -> Vec<String> {
        let devices = self.devices.read().await;
        let mut ids: Vec<_> = devices.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Record an observed reading timestamp. Out-of-order observations
    /// never move `last_seen` backward.
    pub async fn touch(&self, device_id: &str, timestamp: DateTime<Utc>) -> EngineResult<()> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(device_id)
            .ok_or_else(|| EngineError::UnknownDevice(device_id.to_string()))?;

        device.last_seen = Some(match device.last_seen {
            Some(existing) => existing.max(timestamp),
            None => timestamp,
        });
        Ok(())
    }

    /// Connectivity status at `now`: online iff a reading has been seen
    /// within the offline threshold.
    pub async fn status(&self, device_id: &str, now: DateTime<Utc>) -> EngineResult<DeviceStatusInfo> {
        let devices = self.devices.read().await;
        let device = devices
            .get(device_id)
            .ok_or_else(|| EngineError::UnknownDevice(device_id.to_string()))?;

        let status = match device.last_seen {
            Some(last_seen) if now - last_seen <= self.offline_threshold => DeviceStatus::Online,
            _ => DeviceStatus::Offline,
        };

        Ok(DeviceStatusInfo {
            device_id: device.device_id.clone(),
            status,
            last_seen: device.last_seen,
            registered: device.registered_at,
        })
    }
}
