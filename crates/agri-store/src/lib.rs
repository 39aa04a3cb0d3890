//! Raw reading store interface
//!
//! The engine treats reading storage as an external collaborator: an
//! append-only store keyed by device and time, consumed through the
//! [`ReadingStore`] trait. The in-memory implementation backs the daemon
//! and tests; durable backends plug in behind the same seam.

pub mod memory;

pub use memory::*;

use agri_core::Reading;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached; retried on the next poll cycle
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Timeout waiting for store")]
    Timeout,

    #[error("Corrupt stored reading: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only reading store keyed by device and time
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    /// Append one reading. Re-delivery of a reading with the same device
    /// and timestamp must not create a duplicate entry.
    async fn append(&self, reading: Reading) -> StoreResult<()>;

    /// Readings for a device within `[since, until]`, both ends inclusive,
    /// ascending by timestamp.
    async fn list_readings(
        &self,
        device_id: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<Vec<Reading>>;

    /// Most recent reading for a device, if any
    async fn latest_reading(&self, device_id: &str) -> StoreResult<Option<Reading>>;
}
