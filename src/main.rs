//! Metricache exposition server
//!
//! Serves the Prometheus text exposition endpoint over HTTP for a
//! process-wide collector, plus a health endpoint reporting emission status.

use axum::{Router, routing::get};
use clap::Parser;
use metricache::{MetricCollector, PrometheusCollector, config::Config, handlers, telemetry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[command(name = "metricache", about = "Prometheus exposition server for metricache")]
struct Cli {
    /// Path to a TOML configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    telemetry::init(&config.observability.log_level);

    let config = Arc::new(config);
    let collector = Arc::new(PrometheusCollector::new());

    // Process-level diagnostics, computed at scrape time.
    let started = Instant::now();
    collector.record_value_fn(
        "uptime_seconds",
        Box::new(move || started.elapsed().as_secs_f64()),
    );

    let state = handlers::AppState::with_collector(Arc::clone(&config), collector);

    let app = Router::new()
        .route("/metrics", get(handlers::metrics::handler))
        .route("/health", get(handlers::health::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Metrics available at http://{}/metrics", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
