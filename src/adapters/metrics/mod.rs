//! Metrics and Monitoring Adapters
//!
//! Prometheus registry rendered at `/metrics` and the health state
//! behind `/live` and `/ready`.

pub mod health;
pub mod prometheus;

pub use health::HealthState;
pub use prometheus::MetricsRegistry;
