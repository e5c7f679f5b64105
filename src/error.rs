//! Error types for metricache.
//!
//! [`MetricError`] is internal plumbing between the registration cache and
//! the logging layer. The public recording API never returns it: a failed
//! registration or label resolution is logged and the observation dropped,
//! so metrics emission can never fail the caller's primary operation.

use thiserror::Error;

/// Metric kinds, used to qualify log lines and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    CounterFn,
    Gauge,
    GaugeFn,
    Summary,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::CounterFn => "counter_fn",
            MetricKind::Gauge => "gauge",
            MetricKind::GaugeFn => "gauge_fn",
            MetricKind::Summary => "summary",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an observation was dropped.
#[derive(Error, Debug)]
pub enum MetricError {
    /// The backing registry rejected the handle, e.g. the name is already
    /// taken by an incompatible definition registered elsewhere.
    #[error("failed to register {kind} `{name}`: {source}")]
    Registration {
        kind: MetricKind,
        name: String,
        source: prometheus::Error,
    },

    /// The supplied label keys do not match the schema fixed when the
    /// metric was first registered.
    #[error("failed to resolve labels for {kind} `{name}`: {source}")]
    Resolution {
        kind: MetricKind,
        name: String,
        source: prometheus::Error,
    },
}

/// Convenience type alias for Results
pub type MetricResult<T> = Result<T, MetricError>;
