//! Metric Emission
//!
//! Turns node classifications and service states into flat Graphite metric
//! points and hands them to a [`MetricSink`] one at a time.
//!
//! # Naming Scheme
//!
//! - `<prefix>.notinsync.<node>` - `1` for each stale node
//! - `<prefix>.nodes.registered` - total node count
//! - `<prefix>.nodes.last_updated_<window>_ago` - stale node count
//! - `<prefix>.serving[.<host>].<service>` - `1` running, `0` down
//!
//! Node names are used verbatim, so a fully qualified node name adds levels
//! to the Graphite hierarchy.

use crate::cinc::types::ServiceStatusMap;
use crate::config::GraphiteConfig;
use crate::error::Result;
use crate::staleness::NodeClassification;
use std::fmt;
use std::future::Future;
use tracing::{info, warn};

/// A single named value bound for the metrics backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricPoint {
    pub name: String,
    pub value: i64,
}

impl MetricPoint {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl fmt::Display for MetricPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.value)
    }
}

/// Destination for metric points
///
/// Implemented by the Graphite client; tests substitute an in-memory sink.
pub trait MetricSink {
    fn send(&self, point: &MetricPoint) -> impl Future<Output = Result<()>> + Send;
}

/// Builds metric names from the configured prefix and host label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    prefix: String,
    host: Option<String>,
}

impl MetricNames {
    pub fn new(prefix: impl Into<String>, host: Option<&str>) -> Self {
        Self {
            prefix: prefix.into().trim_end_matches('.').to_string(),
            host: host.map(str::to_string),
        }
    }

    pub fn from_config(config: &GraphiteConfig) -> Self {
        Self::new(config.prefix.clone(), config.host_segment())
    }

    pub fn not_in_sync(&self, node: &str) -> String {
        format!("{}.notinsync.{}", self.prefix, node)
    }

    pub fn nodes_registered(&self) -> String {
        format!("{}.nodes.registered", self.prefix)
    }

    pub fn nodes_stale(&self, window_segment: &str) -> String {
        format!("{}.nodes.last_updated_{}_ago", self.prefix, window_segment)
    }

    pub fn serving(&self, service: &str) -> String {
        match &self.host {
            Some(host) => format!("{}.serving.{}.{}", self.prefix, host, service),
            None => format!("{}.serving.{}", self.prefix, service),
        }
    }
}

/// One `notinsync` point per stale node, then the registered and stale counts
pub fn node_points(names: &MetricNames, nodes: &NodeClassification) -> Vec<MetricPoint> {
    let mut points: Vec<MetricPoint> = nodes
        .stale
        .iter()
        .map(|node| MetricPoint::new(names.not_in_sync(&node.name), 1))
        .collect();

    points.push(MetricPoint::new(
        names.nodes_registered(),
        count_value(nodes.registered_count()),
    ));
    points.push(MetricPoint::new(
        names.nodes_stale(&nodes.window.metric_segment()),
        count_value(nodes.stale_count()),
    ));

    points
}

/// One `serving` point per service, in map iteration order
pub fn service_points(names: &MetricNames, statuses: &ServiceStatusMap) -> Vec<MetricPoint> {
    statuses
        .iter()
        .map(|(service, state)| MetricPoint::new(names.serving(service), state.code()))
        .collect()
}

/// Counts as the signed integers Graphite and Prometheus gauges expect
pub fn count_value(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Outcome of sending a batch of points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send every point, logging each one.
///
/// A failed send is logged and counted; the remaining points are still sent.
pub async fn emit<S: MetricSink>(sink: &S, points: &[MetricPoint]) -> EmitReport {
    let mut report = EmitReport::default();

    for point in points {
        match sink.send(point).await {
            Ok(()) => {
                info!("sent metric: {}", point);
                report.sent += 1;
            }
            Err(e) => {
                warn!("Failed to send metric {}: {}", point, e);
                report.failed += 1;
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serving_name_with_and_without_host() {
        let with_host = MetricNames::new("vlg.cinc", Some("chef01"));
        let without_host = MetricNames::new("vlg.cinc.", None);

        assert_eq!(with_host.serving("nginx"), "vlg.cinc.serving.chef01.nginx");
        assert_eq!(without_host.serving("nginx"), "vlg.cinc.serving.nginx");
    }

    #[test]
    fn test_node_names() {
        let names = MetricNames::new("cinc", None);

        assert_eq!(names.not_in_sync("web01"), "cinc.notinsync.web01");
        assert_eq!(names.nodes_registered(), "cinc.nodes.registered");
        assert_eq!(
            names.nodes_stale("1_hour"),
            "cinc.nodes.last_updated_1_hour_ago"
        );
    }

    #[test]
    fn test_host_segment_from_fqdn() {
        let config = GraphiteConfig {
            hostname: Some("chef01.example.com".to_string()),
            ..GraphiteConfig::default()
        };

        assert_eq!(
            MetricNames::from_config(&config).serving("redis_lb"),
            "cinc.serving.chef01.redis_lb"
        );
    }

    #[test]
    fn test_count_value_saturates() {
        assert_eq!(count_value(0), 0);
        assert_eq!(count_value(42), 42);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(count_value(usize::MAX), i64::MAX);
    }

    #[test]
    fn test_point_display_uses_decimal_value() {
        assert_eq!(MetricPoint::new("a.b", 42).to_string(), "a.b 42");
    }
}
