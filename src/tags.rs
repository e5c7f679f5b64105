//! Label sets attached to metric observations.
//!
//! A [`Tags`] value is supplied per call-site, not per metric: the label
//! *keys* of the first call for a given metric name fix that metric's schema
//! for the life of the process, while label *values* vary freely between
//! calls.

use std::collections::{BTreeMap, HashMap};

/// An unordered set of label key/value pairs.
///
/// Backed by a `BTreeMap` so the key schema derived from a tag set is
/// deterministic regardless of insertion order: two tag sets with the same
/// keys always produce the same registered label schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Create an empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a label, replacing any previous value for the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over label pairs in canonical (key-sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Label keys in canonical order. This is the schema a metric is
    /// registered with on first use.
    pub(crate) fn label_keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    /// Label pairs in the shape the backing registry's resolvers expect.
    pub(crate) fn label_map(&self) -> HashMap<&str, &str> {
        self.0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Tags {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Tags(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
