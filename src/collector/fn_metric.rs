//! Function-backed counters and gauges.
//!
//! A function-backed metric reports whatever its registered closure returns
//! at gather time, instead of accumulating push-style updates. The closure
//! is invoked on the gatherer's schedule, so it must be cheap, non-blocking,
//! and safe to call concurrently.

use std::sync::Arc;

use prometheus::core::{Collector, Desc, Describer};
use prometheus::proto;
use prometheus::{Opts, Result};

/// Closure type behind function-backed metrics.
pub type ValueFn = Box<dyn Fn() -> f64 + Send + Sync>;

struct FnMetricCore {
    desc: Desc,
    kind: proto::MetricType,
    value_fn: ValueFn,
}

/// A counter or gauge whose value is computed on demand.
///
/// Registered once per identifier; the closure supplied on first
/// registration is the one used for the life of the process.
#[derive(Clone)]
pub struct FnMetric {
    core: Arc<FnMetricCore>,
}

impl FnMetric {
    /// A monotonic counter backed by `value_fn`.
    pub fn counter(opts: Opts, value_fn: ValueFn) -> Result<FnMetric> {
        Self::with_kind(opts, proto::MetricType::COUNTER, value_fn)
    }

    /// A gauge backed by `value_fn`.
    pub fn gauge(opts: Opts, value_fn: ValueFn) -> Result<FnMetric> {
        Self::with_kind(opts, proto::MetricType::GAUGE, value_fn)
    }

    fn with_kind(opts: Opts, kind: proto::MetricType, value_fn: ValueFn) -> Result<FnMetric> {
        let desc = opts.describe()?;
        Ok(FnMetric {
            core: Arc::new(FnMetricCore {
                desc,
                kind,
                value_fn,
            }),
        })
    }
}

impl Collector for FnMetric {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.core.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let value = (self.core.value_fn)();

        let mut metric = proto::Metric::default();
        match self.core.kind {
            proto::MetricType::GAUGE => {
                let mut gauge = proto::Gauge::default();
                gauge.set_value(value);
                metric.set_gauge(gauge);
            }
            _ => {
                let mut counter = proto::Counter::default();
                counter.set_value(value);
                metric.set_counter(counter);
            }
        }

        let mut family = proto::MetricFamily::default();
        family.set_name(self.core.desc.fq_name.clone());
        family.set_help(self.core.desc.help.clone());
        family.set_field_type(self.core.kind);
        family.mut_metric().push(metric);
        vec![family]
    }
}
