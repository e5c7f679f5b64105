//! HTTP request handlers for the exposition server.

use crate::collector::PrometheusCollector;
use crate::config::Config;
use std::sync::Arc;

pub mod health;
pub mod metrics;

/// Application state shared across all handlers
///
/// Contains configuration and the metric collector. All fields are Arc'd
/// for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    collector: Arc<PrometheusCollector>,
}

impl AppState {
    /// Create a new AppState from configuration with a fresh collector.
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_collector(config, Arc::new(PrometheusCollector::new()))
    }

    /// Create an AppState around an existing collector, e.g. one already
    /// shared with the rest of the application.
    pub fn with_collector(config: Arc<Config>, collector: Arc<PrometheusCollector>) -> Self {
        Self { config, collector }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the metric collector
    pub fn collector(&self) -> &Arc<PrometheusCollector> {
        &self.collector
    }
}
