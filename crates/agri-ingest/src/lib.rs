//! Sensor ingestion adapters
//!
//! This crate provides the interface for producing readings from field
//! hardware. The simulator driver stands in for real devices during
//! development; hardware protocol drivers plug in behind the same trait.

pub mod simulator;

pub use simulator::*;

use agri_core::Reading;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Driver error: {0}")]
    DriverError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Timeout waiting for data")]
    Timeout,
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Trait for all sensor drivers
#[async_trait::async_trait]
pub trait SensorDriver: Send + Sync {
    /// Driver name/identifier
    fn name(&self) -> &str;

    /// Initialize the driver and start data collection
    async fn start(&mut self) -> IngestResult<()>;

    /// Stop the driver and clean up resources
    async fn stop(&mut self) -> IngestResult<()>;

    /// Get the next reading (blocking)
    async fn next_reading(&mut self) -> IngestResult<Reading>;

    /// Check if driver is currently active
    fn is_active(&self) -> bool;
}
