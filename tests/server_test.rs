//! Polling cycle tests
//!
//! Run whole cycles against an in-memory node source, a shell command standing
//! in for `cinc-server-ctl status` and a recording sink.

use chrono::{Duration, Utc};
use cinc_monitor::cinc::types::{Node, NodeSnapshot};
use cinc_monitor::cinc::{NodeSource, StatusCommand};
use cinc_monitor::collectors::{CollectionContext, CollectionStatus};
use cinc_monitor::emitter::{MetricNames, MetricPoint, MetricSink};
use cinc_monitor::error::{MonitorError, Result};
use cinc_monitor::metrics::MetricsCollector;
use cinc_monitor::server::{poll_loop, run_cycle};
use cinc_monitor::staleness::FreshnessWindow;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
struct RecordingSink {
    points: Mutex<Vec<MetricPoint>>,
}

impl RecordingSink {
    fn names(&self) -> HashSet<String> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    fn value_of(&self, name: &str) -> Option<i64> {
        self.points
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value)
    }
}

impl MetricSink for RecordingSink {
    async fn send(&self, point: &MetricPoint) -> Result<()> {
        self.points.lock().unwrap().push(point.clone());
        Ok(())
    }
}

/// Node source returning a fixed snapshot, or failing like a broken database
struct FixedNodes(Option<Vec<Node>>);

impl NodeSource for FixedNodes {
    async fn snapshot(&self) -> Result<NodeSnapshot> {
        match &self.0 {
            Some(nodes) => Ok(NodeSnapshot {
                nodes: nodes.clone(),
                taken_at: Utc::now(),
            }),
            None => Err(MonitorError::from(sqlx::Error::PoolTimedOut)),
        }
    }
}

fn node(name: &str, minutes_ago: i64) -> Node {
    let now = Utc::now();
    Node {
        name: name.to_string(),
        created_at: now - Duration::days(1),
        updated_at: now - Duration::minutes(minutes_ago),
        environment: "_default".to_string(),
    }
}

fn shell(script: &str) -> StatusCommand {
    StatusCommand::from_argv(&["sh".to_string(), "-c".to_string(), script.to_string()])
        .expect("valid argv")
}

fn create_test_metrics() -> MetricsCollector {
    MetricsCollector::new().expect("Failed to create metrics")
}

#[tokio::test]
async fn test_cycle_sends_node_and_service_metrics() {
    // Given: Two nodes (one stale) and three lines of status output
    let nodes = FixedNodes(Some(vec![node("web01", 30), node("web02", 90)]));
    let status = shell(
        "printf 'run: nginx: (pid 123) 500s\\ndown: redis: 10s\\nunrelated text\\n'",
    );
    let sink = RecordingSink::default();
    let names = MetricNames::new("cinc", Some("chef01"));
    let metrics = create_test_metrics();
    let ctx = CollectionContext {
        nodes: &nodes,
        status: &status,
        sink: &sink,
        names: &names,
        metrics: &metrics,
        window: FreshnessWindow::default(),
    };

    // When: Running one cycle
    let outcome = run_cycle(&ctx).await.expect("cycle should not be fatal");

    // Then: Every expected point was sent
    assert_eq!(outcome, CollectionStatus::Success);
    let expected: HashSet<String> = [
        "cinc.notinsync.web02",
        "cinc.nodes.registered",
        "cinc.nodes.last_updated_1_hour_ago",
        "cinc.serving.chef01.nginx",
        "cinc.serving.chef01.redis",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(sink.names(), expected);
    assert_eq!(sink.value_of("cinc.nodes.registered"), Some(2));
    assert_eq!(sink.value_of("cinc.nodes.last_updated_1_hour_ago"), Some(1));
    assert_eq!(sink.value_of("cinc.serving.chef01.nginx"), Some(1));
    assert_eq!(sink.value_of("cinc.serving.chef01.redis"), Some(0));

    // And: Self-instrumentation reflects the cycle
    assert_eq!(metrics.up.get(), 1.0);
    assert_eq!(metrics.cycles_total.get(), 1);
    assert_eq!(metrics.points_sent_total.get(), 5);
    assert_eq!(metrics.nodes_registered.get(), 2);
    assert_eq!(metrics.nodes_stale.get(), 1);
}

#[tokio::test]
async fn test_empty_status_output_is_not_an_error() {
    // Given: A status command that prints nothing
    let nodes = FixedNodes(Some(Vec::new()));
    let status = shell("true");
    let sink = RecordingSink::default();
    let names = MetricNames::new("cinc", None);
    let metrics = create_test_metrics();
    let ctx = CollectionContext {
        nodes: &nodes,
        status: &status,
        sink: &sink,
        names: &names,
        metrics: &metrics,
        window: FreshnessWindow::default(),
    };

    // When: Running one cycle
    let outcome = run_cycle(&ctx).await.expect("cycle should not be fatal");

    // Then: Only the two node summaries are sent
    assert_eq!(outcome, CollectionStatus::Success);
    assert!(!sink.names().iter().any(|name| name.contains(".serving.")));
    assert_eq!(sink.names().len(), 2);
}

#[tokio::test]
async fn test_query_failure_skips_node_metrics_only() {
    // Given: A database that fails and a healthy status command
    let nodes = FixedNodes(None);
    let status = shell("echo 'run: postgresql: connected OK'");
    let sink = RecordingSink::default();
    let names = MetricNames::new("cinc", None);
    let metrics = create_test_metrics();
    let ctx = CollectionContext {
        nodes: &nodes,
        status: &status,
        sink: &sink,
        names: &names,
        metrics: &metrics,
        window: FreshnessWindow::default(),
    };

    // When: Running one cycle
    let outcome = run_cycle(&ctx).await.expect("query errors are not fatal");

    // Then: Service metrics still go out and the cycle is marked failed
    assert_eq!(outcome, CollectionStatus::Failed);
    assert_eq!(sink.value_of("cinc.serving.postgresql"), Some(1));
    assert!(sink.value_of("cinc.nodes.registered").is_none());
    assert_eq!(metrics.up.get(), 0.0);
    assert_eq!(metrics.cycle_failures_total.get(), 1);
}

#[tokio::test]
async fn test_failing_status_command_skips_service_metrics() {
    // Given: A status command that prints a line then exits non-zero
    let nodes = FixedNodes(Some(vec![node("web01", 1)]));
    let status = shell("echo 'run: nginx: (pid 1) 1s'; exit 3");
    let sink = RecordingSink::default();
    let names = MetricNames::new("cinc", None);
    let metrics = create_test_metrics();
    let ctx = CollectionContext {
        nodes: &nodes,
        status: &status,
        sink: &sink,
        names: &names,
        metrics: &metrics,
        window: FreshnessWindow::default(),
    };

    // When: Running one cycle
    let outcome = run_cycle(&ctx).await.expect("non-zero exit is not fatal");

    // Then: Node metrics are sent, service metrics are not
    assert_eq!(outcome, CollectionStatus::Failed);
    assert_eq!(sink.value_of("cinc.nodes.registered"), Some(1));
    assert!(sink.value_of("cinc.serving.nginx").is_none());
}

#[tokio::test]
async fn test_missing_status_command_is_fatal() {
    // Given: A status command that does not exist
    let nodes = FixedNodes(Some(Vec::new()));
    let status = StatusCommand::from_argv(&["/nonexistent/cinc-server-ctl".to_string()])
        .expect("valid argv");
    let sink = RecordingSink::default();
    let names = MetricNames::new("cinc", None);
    let metrics = create_test_metrics();
    let ctx = CollectionContext {
        nodes: &nodes,
        status: &status,
        sink: &sink,
        names: &names,
        metrics: &metrics,
        window: FreshnessWindow::default(),
    };

    // When: Running one cycle
    let result = run_cycle(&ctx).await;

    // Then: The cycle reports a fatal error
    let err = result.expect_err("spawn failure must be fatal");
    let monitor_err = err
        .downcast_ref::<MonitorError>()
        .expect("MonitorError inside");
    assert!(matches!(
        monitor_err,
        MonitorError::StatusCommandSpawn { .. }
    ));
}

#[tokio::test]
async fn test_poll_loop_stops_cleanly_on_shutdown_signal() {
    // Given: A healthy cycle and a shutdown signal that has already fired
    let nodes = FixedNodes(Some(vec![node("web01", 5)]));
    let status = shell("printf 'run: nginx: (pid 1) 5s\\n'");
    let sink = RecordingSink::default();
    let names = MetricNames::new("cinc", None);
    let metrics = create_test_metrics();
    let ctx = CollectionContext {
        nodes: &nodes,
        status: &status,
        sink: &sink,
        names: &names,
        metrics: &metrics,
        window: FreshnessWindow::default(),
    };

    // When: Running the loop with a long period
    let result = poll_loop(&ctx, std::time::Duration::from_secs(3600), async { Ok(()) }).await;

    // Then: The loop returns without error
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_poll_loop_fails_when_signal_handler_cannot_be_installed() {
    // Given: A shutdown future that reports an installation error
    let nodes = FixedNodes(Some(Vec::new()));
    let status = shell("true");
    let sink = RecordingSink::default();
    let names = MetricNames::new("cinc", None);
    let metrics = create_test_metrics();
    let ctx = CollectionContext {
        nodes: &nodes,
        status: &status,
        sink: &sink,
        names: &names,
        metrics: &metrics,
        window: FreshnessWindow::default(),
    };
    let shutdown = async { Err(std::io::Error::other("signal driver unavailable")) };

    // When: Running the loop
    let result = poll_loop(&ctx, std::time::Duration::from_secs(3600), shutdown).await;

    // Then: The error is reported instead of being treated as a clean shutdown
    let err = result.expect_err("handler failure must not look like Ctrl-C");
    let message = format!("{:#}", err);
    assert!(message.contains("Ctrl-C handler"));
    assert!(message.contains("signal driver unavailable"));
}

#[test]
fn test_metrics_endpoint_returns_prometheus_format() {
    // Given: A metrics collector with some metrics set
    let metrics = create_test_metrics();
    metrics.up.set(1.0);
    metrics
        .service_status
        .with_label_values(&["nginx"])
        .set(1);

    // When: Rendering metrics to Prometheus format
    let rendered = metrics.render().expect("Failed to render metrics");

    // Then: Output should be valid Prometheus format
    assert!(rendered.contains("# HELP"), "Missing HELP comment");
    assert!(rendered.contains("# TYPE"), "Missing TYPE comment");
    assert!(rendered.contains("cinc_monitor_up 1"), "Missing up metric");
    assert!(
        rendered.contains("cinc_monitor_service_status{service=\"nginx\"} 1"),
        "Missing service_status metric"
    );
}

#[test]
fn test_health_check_logic() {
    let metrics = create_test_metrics();

    // Simulate healthy state
    metrics.up.set(1.0);
    assert!(metrics.up.get() > 0.0, "Health check should pass when up > 0");

    // Simulate unhealthy state
    metrics.up.set(0.0);
    assert!(metrics.up.get() == 0.0, "Health check should fail when up == 0");
}
