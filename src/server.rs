//! Polling Loop and Status Endpoint
//!
//! This module owns the collaborators (database pool, Graphite connection,
//! status command) and runs the polling cycles.
//!
//! # Polling
//!
//! Every `interval_seconds` one cycle runs, strictly in order:
//! 1. Snapshot the nodes table, classify staleness, send node metrics
//! 2. Run the status command, parse it, send service metrics
//!
//! Cycles never overlap. Nothing is cancelled or timed out, so a hung database
//! or Graphite connection stalls the loop until it recovers.
//!
//! # Error Handling
//!
//! A failed query or a status command exiting non-zero is logged and that data
//! set is skipped until the next cycle. A status command that cannot be started
//! stops the process. In one-shot mode any failed collector fails the run.
//!
//! # Endpoints
//!
//! When `server.enabled` is set:
//! - `GET /` - HTML landing page with links to metrics and health
//! - `GET /metrics` - Self-instrumentation in Prometheus text format
//! - `GET /health` - 200 if the last cycle succeeded, 503 otherwise

use crate::cinc::{NodeSource, NodeStore, StatusCommand};
use crate::collectors::{self, CollectionContext, CollectionStatus};
use crate::config::{Config, ServerConfig};
use crate::emitter::{MetricNames, MetricSink};
use crate::graphite::GraphiteClient;
use crate::metrics::MetricsCollector;
use crate::staleness::FreshnessWindow;
use anyhow::Context;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::Future;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};

/// How many cycles to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Poll until interrupted
    Continuous,
    /// Run a single cycle and return
    Once,
}

pub async fn start(config: Config, mode: RunMode) -> anyhow::Result<()> {
    config.validate()?;

    let metrics = MetricsCollector::new()?;
    let status = StatusCommand::from_argv(&config.poller.status_command)?;
    let names = MetricNames::from_config(&config.graphite);
    let window = FreshnessWindow::from_minutes(config.poller.stale_after_minutes);

    let store = NodeStore::connect(&config.database)
        .await
        .context("Unable to connect to database")?;
    let graphite = GraphiteClient::connect(&config.graphite)
        .await
        .context("Unable to connect to Graphite")?;

    info!("Status command: {}", status.display());
    info!("Graphite: {} (prefix {})", graphite.addr(), config.graphite.prefix);
    info!("Nodes are stale after {}", window);

    if config.server.enabled && mode == RunMode::Continuous {
        spawn_status_server(&config.server, metrics.clone()).await?;
    }

    let ctx = CollectionContext {
        nodes: &store,
        status: &status,
        sink: &graphite,
        names: &names,
        metrics: &metrics,
        window,
    };

    let result = match mode {
        RunMode::Once => run_cycle(&ctx).await.and_then(|status| match status {
            CollectionStatus::Success => Ok(()),
            CollectionStatus::Failed => {
                Err(anyhow::anyhow!("Polling cycle failed - see warnings above"))
            }
        }),
        RunMode::Continuous => {
            let period = Duration::from_secs(config.poller.interval_seconds);
            poll_loop(&ctx, period, tokio::signal::ctrl_c()).await
        }
    };

    store.close().await;
    result
}

/// Run a cycle on every tick until `shutdown` resolves.
///
/// `shutdown` is polled across cycles, so a signal that arrives mid-cycle
/// stops the loop at the next tick. An error from it (the signal handler
/// could not be installed) ends the loop with that error.
pub async fn poll_loop<N, S, F>(
    ctx: &CollectionContext<'_, N, S>,
    period: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    N: NodeSource,
    S: MetricSink,
    F: Future<Output = std::io::Result<()>>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = &mut shutdown => {
                return match signal {
                    Ok(()) => {
                        info!("Shutdown requested, stopping poller");
                        Ok(())
                    }
                    Err(e) => {
                        error!("Unable to listen for Ctrl-C: {}", e);
                        Err(anyhow::Error::new(e).context("Failed to install Ctrl-C handler"))
                    }
                };
            }
        }

        if let Err(e) = run_cycle(ctx).await {
            error!("Fatal error during polling cycle: {}", e);
            return Err(e);
        }
    }
}

/// Run both collectors once, in order.
///
/// Returns `Failed` if either data set was skipped; `Err` only for fatal errors.
pub async fn run_cycle<N, S>(ctx: &CollectionContext<'_, N, S>) -> anyhow::Result<CollectionStatus>
where
    N: NodeSource,
    S: MetricSink,
{
    ctx.metrics.cycles_total.inc();

    let mut all_success = true;

    // Helper macro to track failures
    macro_rules! collect {
        ($collector:expr) => {
            match $collector.await? {
                CollectionStatus::Success => {}
                CollectionStatus::Failed => all_success = false,
            }
        };
    }

    collect!(collectors::collect_node_metrics(ctx));
    collect!(collectors::collect_service_metrics(ctx));

    if all_success {
        ctx.metrics.up.set(1.0);
        Ok(CollectionStatus::Success)
    } else {
        warn!("Polling cycle finished with skipped data sets");
        ctx.metrics.up.set(0.0);
        ctx.metrics.cycle_failures_total.inc();
        Ok(CollectionStatus::Failed)
    }
}

async fn spawn_status_server(
    config: &ServerConfig,
    metrics: MetricsCollector,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Unable to bind status endpoint on {}", addr))?;

    info!("Status endpoint listening on http://{}/", addr);

    let app = router(metrics);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Status endpoint error: {}", e);
        }
    });

    Ok(())
}

/// Routes for the status endpoint
pub fn router(metrics: MetricsCollector) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(metrics)
}

async fn root_handler() -> impl IntoResponse {
    r#"<html>
<head><title>CINC Monitor</title></head>
<body>
<h1>CINC Server Monitor</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#
}

async fn metrics_handler(State(metrics): State<MetricsCollector>) -> Response {
    match metrics.render() {
        Ok(rendered) => rendered.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler(State(metrics): State<MetricsCollector>) -> impl IntoResponse {
    if metrics.up.get() > 0.0 {
        (axum::http::StatusCode::OK, "OK")
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Last polling cycle failed",
        )
    }
}
