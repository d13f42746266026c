//! `orderflow-observability` — process-wide telemetry setup.

pub mod tracing;

pub use tracing::init;
