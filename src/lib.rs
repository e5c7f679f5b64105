//! Metricache - lazily-registered Prometheus metrics facade
//!
//! Application code emits counters, gauges, and latency observations by name
//! plus an optional label set; a concurrency-safe registration cache
//! guarantees each distinct metric is registered with the backing
//! [`prometheus::Registry`] exactly once and reused by every caller.
//!
//! ```
//! use metricache::{MetricCollector, PrometheusCollector, Tags};
//!
//! let collector = PrometheusCollector::new();
//! collector.increment_counter("users_created", None);
//! collector.increment_counter("requests", Some(Tags::from([("status", "ok")])));
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod handlers;
pub mod tags;
pub mod telemetry;

pub use collector::{MetricCollector, PrometheusCollector, ValueFn};
pub use tags::Tags;
