//! Summary metrics with streaming quantile estimation.
//!
//! The `prometheus` crate ships counters, gauges and histograms but no
//! summary type, so the vector summary lives here. Each labeled child keeps
//! a CKMS sketch plus a running sum and count, and the family serializes
//! itself through [`prometheus::core::Collector`], so the owning registry's
//! `gather()` (and therefore the text exposition) sees it like any built-in
//! metric.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use prometheus::core::{Collector, Desc, Describer};
use prometheus::proto;
use prometheus::{Opts, Result};
use quantiles::ckms::CKMS;

/// Quantile objectives as `(quantile, allowed error)` pairs.
///
/// The sketch is built with the tightest listed error, so every advertised
/// tolerance is met.
pub const DEFAULT_OBJECTIVES: &[(f64, f64)] = &[(0.5, 0.05), (0.95, 0.01), (0.99, 0.001)];

struct Window {
    sketch: CKMS<f64>,
    count: u64,
    sum: f64,
}

struct SummaryCore {
    label_values: Vec<String>,
    window: Mutex<Window>,
}

/// A single summary time series: one concrete label-value assignment within
/// a [`SummaryVec`] family.
#[derive(Clone)]
pub struct Summary {
    core: Arc<SummaryCore>,
}

impl Summary {
    fn new(label_values: Vec<String>, epsilon: f64) -> Self {
        Summary {
            core: Arc::new(SummaryCore {
                label_values,
                window: Mutex::new(Window {
                    sketch: CKMS::new(epsilon),
                    count: 0,
                    sum: 0.0,
                }),
            }),
        }
    }

    /// Record one observation.
    pub fn observe(&self, value: f64) {
        let mut window = self
            .core
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        window.sketch.insert(value);
        window.count += 1;
        window.sum += value;
    }

    fn to_proto(&self, label_names: &[String], objectives: &[(f64, f64)]) -> proto::Metric {
        let mut metric = proto::Metric::default();
        for (name, value) in label_names.iter().zip(&self.core.label_values) {
            let mut pair = proto::LabelPair::default();
            pair.set_name(name.clone());
            pair.set_value(value.clone());
            metric.mut_label().push(pair);
        }

        let window = self
            .core
            .window
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut summary = proto::Summary::default();
        summary.set_sample_count(window.count);
        summary.set_sample_sum(window.sum);
        for &(quantile, _) in objectives {
            let mut q = proto::Quantile::default();
            q.set_quantile(quantile);
            q.set_value(window.sketch.query(quantile).map_or(f64::NAN, |(_, v)| v));
            summary.mut_quantile().push(q);
        }
        metric.set_summary(summary);
        metric
    }
}

struct SummaryVecCore {
    desc: Desc,
    objectives: Vec<(f64, f64)>,
    epsilon: f64,
    // Keyed by label values in schema order; BTreeMap keeps exposition
    // output deterministic across gathers.
    children: RwLock<BTreeMap<Vec<String>, Summary>>,
}

/// A summary family partitioned into addressable series by label values.
///
/// Children are created lazily on first resolution and never removed.
#[derive(Clone)]
pub struct SummaryVec {
    core: Arc<SummaryVecCore>,
}

impl SummaryVec {
    pub fn new(opts: Opts, label_names: &[&str], objectives: &[(f64, f64)]) -> Result<SummaryVec> {
        let variable_labels: Vec<String> = label_names.iter().map(|s| s.to_string()).collect();
        let desc = opts.variable_labels(variable_labels).describe()?;
        let epsilon = objectives
            .iter()
            .map(|&(_, error)| error)
            .fold(f64::INFINITY, f64::min);
        let epsilon = if epsilon.is_finite() { epsilon } else { 0.01 };

        Ok(SummaryVec {
            core: Arc::new(SummaryVecCore {
                desc,
                objectives: objectives.to_vec(),
                epsilon,
                children: RwLock::new(BTreeMap::new()),
            }),
        })
    }

    /// Resolve the series for a concrete label-value assignment, creating it
    /// on first use.
    ///
    /// Fails if the supplied label keys do not match the schema this family
    /// was created with.
    pub fn get_metric_with(&self, labels: &HashMap<&str, &str>) -> Result<Summary> {
        let values = self.label_values_for(labels)?;

        if let Some(child) = self
            .core
            .children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&values)
        {
            return Ok(child.clone());
        }

        let mut children = self
            .core
            .children
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(child) = children.get(&values) {
            return Ok(child.clone());
        }
        let child = Summary::new(values.clone(), self.core.epsilon);
        children.insert(values, child.clone());
        Ok(child)
    }

    fn label_values_for(&self, labels: &HashMap<&str, &str>) -> Result<Vec<String>> {
        let names = &self.core.desc.variable_labels;
        if labels.len() != names.len() {
            return Err(prometheus::Error::InconsistentCardinality {
                expect: names.len(),
                got: labels.len(),
            });
        }
        names
            .iter()
            .map(|name| {
                labels
                    .get(name.as_str())
                    .map(|v| v.to_string())
                    .ok_or_else(|| {
                        prometheus::Error::Msg(format!("label name {name} missing in label map"))
                    })
            })
            .collect()
    }
}

impl Collector for SummaryVec {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.core.desc]
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        let children = self
            .core
            .children
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut family = proto::MetricFamily::default();
        family.set_name(self.core.desc.fq_name.clone());
        family.set_help(self.core.desc.help.clone());
        family.set_field_type(proto::MetricType::SUMMARY);
        for child in children.values() {
            family
                .mut_metric()
                .push(child.to_proto(&self.core.desc.variable_labels, &self.core.objectives));
        }
        vec![family]
    }
}
