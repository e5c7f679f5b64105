//! The metric registry cache.
//!
//! Five recording operations on top of a [`prometheus::Registry`] that
//! itself requires explicit, single registration per distinct metric name.
//! The cache maps a first-seen metric name (and label-key schema) to a
//! long-lived handle: one registration per identifier, reused by every
//! caller afterwards.
//!
//! Recording never fails the caller. If the backing registry rejects a
//! registration or a label set cannot be resolved against the schema fixed
//! at first use, the failure is logged and the observation dropped.

mod fn_metric;
mod summary;

pub use fn_metric::{FnMetric, ValueFn};
pub use summary::{DEFAULT_OBJECTIVES, Summary, SummaryVec};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::{MetricError, MetricKind, MetricResult};
use crate::tags::Tags;

/// Marker prepended to every caller-supplied metric name before it reaches
/// the backing registry. The namespaced name is a pure function of the
/// caller-supplied name.
pub const METRIC_PREFIX: &str = "__";

/// The five recording operations.
///
/// Every operation is safe for concurrent use from any thread, requires no
/// setup beyond constructing the collector, and never returns an error:
/// metrics emission must never fail the caller's primary operation.
pub trait MetricCollector: Send + Sync {
    /// Increment a monotonic counter by 1, registering it on first use with
    /// the label-key schema of `tags` (or no labels if `None`).
    fn increment_counter(&self, name: &str, tags: Option<Tags>);

    /// Register, on first call only, a counter whose displayed value is
    /// always `value_fn()`. Later calls for the same name are ignored.
    fn increment_counter_fn(&self, name: &str, value_fn: ValueFn);

    /// Record `duration` (whole milliseconds) into a latency summary,
    /// registering it on first use.
    fn record_execution_time(&self, name: &str, duration: Duration, tags: Option<Tags>);

    /// Set a gauge to `value`, registering it on first use.
    fn record_value(&self, name: &str, value: f64, tags: Option<Tags>);

    /// Register, on first call only, a gauge whose displayed value is always
    /// `value_fn()`. Later calls for the same name are ignored.
    fn record_value_fn(&self, name: &str, value_fn: ValueFn);
}

/// Metric registry cache backed by a [`prometheus::Registry`].
///
/// Owns five insert-only caches, one per metric kind. Entries are created
/// lazily on first use and live for the life of the process; nothing is
/// ever removed or reconfigured. The warm path (metric already known) takes
/// only a read guard, so steady-state recording contends on nothing but the
/// backing handle's own atomics.
pub struct PrometheusCollector {
    registry: Registry,
    counters: RwLock<HashMap<String, CounterVec>>,
    counter_fns: RwLock<HashMap<String, FnMetric>>,
    gauges: RwLock<HashMap<String, GaugeVec>>,
    gauge_fns: RwLock<HashMap<String, FnMetric>>,
    summaries: RwLock<HashMap<String, SummaryVec>>,
    dropped: AtomicU64,
}

impl PrometheusCollector {
    /// Create a collector with its own private registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a collector on top of an existing registry, e.g. one shared
    /// with other instrumentation in the composition root.
    pub fn with_registry(registry: Registry) -> Self {
        PrometheusCollector {
            registry,
            counters: RwLock::new(HashMap::new()),
            counter_fns: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            gauge_fns: RwLock::new(HashMap::new()),
            summaries: RwLock::new(HashMap::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// The backing registry. Every handle created by this collector is
    /// discoverable through it.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of recording operations dropped because registration or label
    /// resolution failed.
    pub fn dropped_observations(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Serialize every registered metric into the Prometheus text
    /// exposition format.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics output is not valid UTF-8: {e}")))
    }

    /// Double-checked lazy registration, shared by all five kinds.
    ///
    /// The optimistic read covers the warm path; on miss the kind's write
    /// lock is taken and the map re-checked, so a race between concurrent
    /// first-callers registers exactly one handle. `build` runs only when
    /// the identifier is genuinely absent.
    fn get_or_register<T, F>(
        &self,
        kind: MetricKind,
        name: &str,
        cache: &RwLock<HashMap<String, T>>,
        build: F,
    ) -> MetricResult<T>
    where
        T: prometheus::core::Collector + Clone + 'static,
        F: FnOnce(&str) -> prometheus::Result<T>,
    {
        let id = namespaced(name);
        if let Some(handle) = read_guard(cache).get(&id) {
            return Ok(handle.clone());
        }

        let mut handles = write_guard(cache);
        if let Some(handle) = handles.get(&id) {
            return Ok(handle.clone());
        }

        let handle = build(&id)
            .and_then(|handle| {
                self.registry
                    .register(Box::new(handle.clone()))
                    .map(|()| handle)
            })
            .map_err(|source| MetricError::Registration {
                kind,
                name: name.to_string(),
                source,
            })?;
        tracing::debug!(metric = %id, kind = %kind, "registered metric on first use");
        handles.insert(id, handle.clone());
        Ok(handle)
    }

    fn drop_observation(&self, err: &MetricError) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::error!(error = %err, "metric observation dropped");
    }
}

impl Default for PrometheusCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricCollector for PrometheusCollector {
    fn increment_counter(&self, name: &str, tags: Option<Tags>) {
        let tags = tags.unwrap_or_default();
        let result = self
            .get_or_register(MetricKind::Counter, name, &self.counters, |id| {
                CounterVec::new(Opts::new(id, help_text(name)), &tags.label_keys())
            })
            .and_then(|vec| {
                vec.get_metric_with(&tags.label_map())
                    .map_err(|source| MetricError::Resolution {
                        kind: MetricKind::Counter,
                        name: name.to_string(),
                        source,
                    })
            });
        match result {
            Ok(counter) => counter.inc(),
            Err(err) => self.drop_observation(&err),
        }
    }

    fn increment_counter_fn(&self, name: &str, value_fn: ValueFn) {
        let result = self.get_or_register(MetricKind::CounterFn, name, &self.counter_fns, |id| {
            FnMetric::counter(Opts::new(id, help_text(name)), value_fn)
        });
        if let Err(err) = result {
            self.drop_observation(&err);
        }
    }

    fn record_execution_time(&self, name: &str, duration: Duration, tags: Option<Tags>) {
        let tags = tags.unwrap_or_default();
        let result = self
            .get_or_register(MetricKind::Summary, name, &self.summaries, |id| {
                SummaryVec::new(
                    Opts::new(id, help_text(name)),
                    &tags.label_keys(),
                    DEFAULT_OBJECTIVES,
                )
            })
            .and_then(|vec| {
                vec.get_metric_with(&tags.label_map())
                    .map_err(|source| MetricError::Resolution {
                        kind: MetricKind::Summary,
                        name: name.to_string(),
                        source,
                    })
            });
        match result {
            Ok(series) => series.observe(duration.as_millis() as f64),
            Err(err) => self.drop_observation(&err),
        }
    }

    fn record_value(&self, name: &str, value: f64, tags: Option<Tags>) {
        let tags = tags.unwrap_or_default();
        let result = self
            .get_or_register(MetricKind::Gauge, name, &self.gauges, |id| {
                GaugeVec::new(Opts::new(id, help_text(name)), &tags.label_keys())
            })
            .and_then(|vec| {
                vec.get_metric_with(&tags.label_map())
                    .map_err(|source| MetricError::Resolution {
                        kind: MetricKind::Gauge,
                        name: name.to_string(),
                        source,
                    })
            });
        match result {
            Ok(gauge) => gauge.set(value),
            Err(err) => self.drop_observation(&err),
        }
    }

    fn record_value_fn(&self, name: &str, value_fn: ValueFn) {
        let result = self.get_or_register(MetricKind::GaugeFn, name, &self.gauge_fns, |id| {
            FnMetric::gauge(Opts::new(id, help_text(name)), value_fn)
        });
        if let Err(err) = result {
            self.drop_observation(&err);
        }
    }
}

fn namespaced(name: &str) -> String {
    format!("{METRIC_PREFIX}{name}")
}

fn help_text(name: &str) -> String {
    format!("{name} (registered on first use)")
}

// A poisoned cache lock means a writer panicked mid-insert elsewhere; the
// map itself only ever grows, so the data is still usable and emission must
// keep working.
fn read_guard<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_guard<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
