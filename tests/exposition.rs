//! End-to-end exposition tests through the HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use metricache::collector::MetricCollector;
use metricache::config::Config;
use metricache::handlers::{self, AppState};
use metricache::Tags;
use std::sync::Arc;
use std::time::Duration;

fn create_test_state() -> AppState {
    AppState::new(Arc::new(Config::default()))
}

#[tokio::test]
async fn test_scrape_after_emitting_all_five_kinds() {
    let state = create_test_state();
    let collector = state.collector();

    collector.increment_counter("my_counter", Some(Tags::from([("type", "example")])));
    collector.increment_counter("my_counter", Some(Tags::from([("type", "example")])));
    collector.increment_counter("my_counter_empty", None);
    collector.increment_counter("my_counter_empty", None);
    collector.increment_counter_fn("my_counter_fn", Box::new(|| 1.0));

    collector.record_execution_time("my_execution_time", Duration::from_millis(1000), None);
    collector.record_execution_time("my_execution_time", Duration::from_millis(2000), None);
    collector.record_execution_time("my_execution_time", Duration::from_millis(3000), None);

    collector.record_value("my_value", 100.0, None);
    collector.record_value_fn("my_value_fn", Box::new(|| 100.0));

    let (status, body) = handlers::metrics::handler(State(state)).await;
    assert_eq!(status, StatusCode::OK);

    assert!(body.contains(r#"__my_counter{type="example"} 2"#));
    assert!(body.contains("__my_counter_empty 2"));
    assert!(body.contains("__my_counter_fn 1"));

    assert!(body.contains(r#"__my_execution_time{quantile="0.5"} 2000"#));
    assert!(body.contains(r#"__my_execution_time{quantile="0.95"} 3000"#));
    assert!(body.contains(r#"__my_execution_time{quantile="0.99"} 3000"#));
    assert!(body.contains("__my_execution_time_sum 6000"));
    assert!(body.contains("__my_execution_time_count 3"));

    assert!(body.contains("__my_value 100"));
    assert!(body.contains("__my_value_fn 100"));
}

#[tokio::test]
async fn test_scrape_reflects_observations_between_requests() {
    let state = create_test_state();

    state.collector().increment_counter("users_created", None);
    let (_, first) = handlers::metrics::handler(State(state.clone())).await;
    assert!(first.contains("__users_created 1"));

    for _ in 0..3 {
        state.collector().increment_counter("users_created", None);
    }
    let (_, second) = handlers::metrics::handler(State(state)).await;
    assert!(second.contains("__users_created 4"));
}

#[tokio::test]
async fn test_health_reports_degraded_after_schema_mismatch() {
    let state = create_test_state();

    let (status, Json(body)) = handlers::health::handler(State(state.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.emission_status, "operational");

    state
        .collector()
        .increment_counter("x", Some(Tags::from([("type", "a")])));
    state
        .collector()
        .increment_counter("x", Some(Tags::from([("other_type", "a")])));

    let (status, Json(body)) = handlers::health::handler(State(state)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.emission_status, "degraded");
    assert_eq!(body.dropped_observations, 1);
}

#[tokio::test]
async fn test_concurrent_emission_and_scraping() {
    let state = create_test_state();

    let emitters: Vec<_> = (0..4)
        .map(|_| {
            let state = state.clone();
            tokio::task::spawn_blocking(move || {
                for _ in 0..500 {
                    state.collector().increment_counter("stream", None);
                }
            })
        })
        .collect();

    let scrapers: Vec<_> = (0..4)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move {
                let (status, _) = handlers::metrics::handler(State(state)).await;
                assert_eq!(status, StatusCode::OK);
            })
        })
        .collect();

    for task in futures::future::join_all(emitters).await {
        task.expect("emitter should not panic");
    }
    for task in futures::future::join_all(scrapers).await {
        task.expect("scraper should not panic");
    }

    let (_, body) = handlers::metrics::handler(State(state)).await;
    assert!(body.contains("__stream 2000"));
}
