//! Integration tests for label-key schema handling.
//!
//! The label keys of the first call for a metric name fix its schema for
//! the life of the process; label values vary freely between calls.

use metricache::{MetricCollector, PrometheusCollector, Tags};

#[test]
fn test_label_values_partition_one_family() {
    let collector = PrometheusCollector::new();
    collector.increment_counter("x", Some(Tags::from([("status", "a")])));
    collector.increment_counter("x", Some(Tags::from([("status", "b")])));
    collector.increment_counter("x", Some(Tags::from([("status", "b")])));

    let families = collector.registry().gather();
    assert_eq!(families.len(), 1, "one family for one metric name");
    let metrics = families[0].get_metric();
    assert_eq!(metrics.len(), 2, "one series per distinct label value");

    let output = collector.gather().expect("should gather");
    assert!(output.contains(r#"__x{status="a"} 1"#));
    assert!(output.contains(r#"__x{status="b"} 2"#));
}

#[test]
fn test_mismatched_key_set_is_dropped() {
    let collector = PrometheusCollector::new();
    collector.increment_counter("x", Some(Tags::from([("type", "example")])));
    collector.increment_counter("x", Some(Tags::from([("other_type", "example")])));

    assert_eq!(collector.dropped_observations(), 1);

    let output = collector.gather().expect("should gather");
    assert!(output.contains(r#"__x{type="example"} 1"#));
    assert!(
        !output.contains("other_type"),
        "mismatched schema must not create or alter series"
    );
}

#[test]
fn test_superset_key_set_is_dropped() {
    let collector = PrometheusCollector::new();
    collector.increment_counter("x", Some(Tags::from([("type", "example")])));
    collector.increment_counter(
        "x",
        Some(Tags::from([("type", "example"), ("extra", "1")])),
    );

    assert_eq!(collector.dropped_observations(), 1);
    let families = collector.registry().gather();
    assert_eq!(families[0].get_metric().len(), 1);
    assert_eq!(families[0].get_metric()[0].get_counter().get_value(), 1.0);
}

#[test]
fn test_empty_tags_and_none_address_same_series() {
    let collector = PrometheusCollector::new();
    collector.increment_counter("y", None);
    collector.increment_counter("y", Some(Tags::new()));

    let families = collector.registry().gather();
    assert_eq!(families[0].get_metric().len(), 1);
    assert_eq!(families[0].get_metric()[0].get_counter().get_value(), 2.0);
}

#[test]
fn test_tag_insertion_order_does_not_split_series() {
    let collector = PrometheusCollector::new();
    collector.increment_counter(
        "z",
        Some(Tags::new().with("a", "1").with("b", "2")),
    );
    collector.increment_counter(
        "z",
        Some(Tags::new().with("b", "2").with("a", "1")),
    );

    let families = collector.registry().gather();
    assert_eq!(families[0].get_metric().len(), 1);
    assert_eq!(families[0].get_metric()[0].get_counter().get_value(), 2.0);
    assert_eq!(collector.dropped_observations(), 0);
}

#[test]
fn test_gauge_schema_is_fixed_independently_of_counter() {
    let collector = PrometheusCollector::new();
    collector.increment_counter("shared_name_counter", Some(Tags::from([("env", "prod")])));
    collector.record_value("shared_name_gauge", 1.0, Some(Tags::from([("zone", "eu")])));

    // Each kind's cache fixed its own schema; mismatches are per metric.
    collector.record_value("shared_name_gauge", 2.0, Some(Tags::from([("env", "prod")])));
    assert_eq!(collector.dropped_observations(), 1);

    let output = collector.gather().expect("should gather");
    assert!(output.contains(r#"__shared_name_gauge{zone="eu"} 1"#));
}
