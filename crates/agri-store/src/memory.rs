//! In-memory reading store

use crate::{ReadingStore, StoreError, StoreResult};
use agri_core::Reading;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store: per-device readings ordered by timestamp
///
/// Readings are keyed by timestamp, so re-delivery of the same reading
/// replaces rather than duplicates, and range queries come back in
/// ascending order.
#[derive(Clone, Default)]
pub struct MemoryStore {
    readings: Arc<RwLock<HashMap<String, BTreeMap<DateTime<Utc>, Reading>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored readings across all devices
    pub async fn len(&self) -> usize {
        let readings = self.readings.read().await;
        readings.values().map(|per_device| per_device.len()).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryStore {
    async fn append(&self, reading: Reading) -> StoreResult<()> {
        if reading.device_id.is_empty() {
            return Err(StoreError::Corrupt("reading without device_id".into()));
        }

        let mut readings = self.readings.write().await;
        readings
            .entry(reading.device_id.clone())
            .or_default()
            .insert(reading.timestamp, reading);
        Ok(())
    }

    async fn list_readings(
        &self,
        device_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<Reading>> {
        let readings = self.readings.read().await;
        let Some(per_device) = readings.get(device_id) else {
            return Ok(Vec::new());
        };

        Ok(per_device
            .range(since..=until)
            .map(|(_, reading)| reading.clone())
            .collect())
    }

    async fn latest_reading(&self, device_id: &str) -> StoreResult<Option<Reading>> {
        let readings = self.readings.read().await;
        Ok(readings
            .get(device_id)
            .and_then(|per_device| per_device.values().next_back().cloned()))
    }
}
