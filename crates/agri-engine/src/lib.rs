//! Telemetry alerting and analytics engine
//!
//! Turns the raw reading stream into device liveness, a deduplicated
//! alert stream, windowed aggregate statistics, and irrigation guidance.
//! The [`Engine`] facade bundles the components and exposes the contract
//! consumed by the presentation layer.

pub mod advisor;
pub mod aggregate;
pub mod alerts;
pub mod engine;
pub mod poller;
pub mod registry;

pub use advisor::*;
pub use aggregate::*;
pub use alerts::*;
pub use engine::*;
pub use poller::*;
pub use registry::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Device already registered: {0}")]
    DuplicateDevice(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("No data available for device: {0}")]
    NoData(String),

    #[error("Store error: {0}")]
    Store(#[from] agri_store::StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
