//! # tagbus Telemetry
//!
//! Crate for logging setup and client metrics.

pub mod logging;
pub mod metrics;

pub use logging::EventLogger;
pub use metrics::MetricsRecorder;
