//! Core data types and statistics for the AgriWeather telemetry engine
//!
//! This crate provides the fundamental data structures shared by the
//! store, engine, ingest, and presentation layers.

pub mod stats;
pub mod types;

pub use stats::*;
pub use types::*;
