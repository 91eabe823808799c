//! Poller Self-Instrumentation
//!
//! Prometheus metrics describing the monitor itself, served on `/metrics`
//! when the status endpoint is enabled. The Graphite points are the monitor's
//! output; these describe how well it is producing them.
//!
//! All metrics use the `cinc_monitor` namespace.

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics about the polling loop
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    pub up: Arc<Gauge>,
    pub cycles_total: Arc<IntCounter>,
    pub cycle_failures_total: Arc<IntCounter>,

    // Graphite delivery
    pub points_sent_total: Arc<IntCounter>,
    pub point_send_failures_total: Arc<IntCounter>,

    // Last observed values
    pub nodes_registered: Arc<IntGauge>,
    pub nodes_stale: Arc<IntGauge>,
    pub service_status: Arc<IntGaugeVec>,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let up = Gauge::with_opts(
            Opts::new("up", "Whether the last polling cycle succeeded (1=yes, 0=no)")
                .namespace("cinc_monitor"),
        )?;

        let cycles_total = IntCounter::with_opts(
            Opts::new("cycles_total", "Polling cycles started").namespace("cinc_monitor"),
        )?;

        let cycle_failures_total = IntCounter::with_opts(
            Opts::new(
                "cycle_failures_total",
                "Polling cycles in which at least one collector failed",
            )
            .namespace("cinc_monitor"),
        )?;

        let points_sent_total = IntCounter::with_opts(
            Opts::new("points_sent_total", "Metric points written to Graphite")
                .namespace("cinc_monitor"),
        )?;

        let point_send_failures_total = IntCounter::with_opts(
            Opts::new(
                "point_send_failures_total",
                "Metric points that could not be written to Graphite",
            )
            .namespace("cinc_monitor"),
        )?;

        let nodes_registered = IntGauge::with_opts(
            Opts::new("nodes_registered", "Nodes registered with the CINC server")
                .namespace("cinc_monitor"),
        )?;

        let nodes_stale = IntGauge::with_opts(
            Opts::new(
                "nodes_stale",
                "Nodes not updated within the freshness window",
            )
            .namespace("cinc_monitor"),
        )?;

        let service_status = IntGaugeVec::new(
            Opts::new(
                "service_status",
                "CINC server service status (1=running, 0=down)",
            )
            .namespace("cinc_monitor"),
            &["service"],
        )?;

        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(cycles_total.clone()))?;
        registry.register(Box::new(cycle_failures_total.clone()))?;
        registry.register(Box::new(points_sent_total.clone()))?;
        registry.register(Box::new(point_send_failures_total.clone()))?;
        registry.register(Box::new(nodes_registered.clone()))?;
        registry.register(Box::new(nodes_stale.clone()))?;
        registry.register(Box::new(service_status.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            up: Arc::new(up),
            cycles_total: Arc::new(cycles_total),
            cycle_failures_total: Arc::new(cycle_failures_total),
            points_sent_total: Arc::new(points_sent_total),
            point_send_failures_total: Arc::new(point_send_failures_total),
            nodes_registered: Arc::new(nodes_registered),
            nodes_stale: Arc::new(nodes_stale),
            service_status: Arc::new(service_status),
        })
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Count the outcome of one batch of Graphite sends
    pub fn record_emit(&self, report: crate::emitter::EmitReport) {
        self.points_sent_total.inc_by(report.sent as u64);
        self.point_send_failures_total.inc_by(report.failed as u64);
    }
}
