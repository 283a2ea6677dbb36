//! Prometheus metrics and structured logging for arbx.
//!
//! - Prometheus metrics for broker stability, adapter calls and routing
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
