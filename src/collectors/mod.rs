//! Metrics Collectors
//!
//! One collector per data set the monitor reports. Each collector queries its
//! source, turns the result into Graphite points, sends them and updates the
//! self-instrumentation metrics.
//!
//! # Architecture
//!
//! Collectors follow a consistent pattern:
//! - Accept a `CollectionContext` containing shared state
//! - Query the node store or run the status command
//! - Emit points through the metric sink
//! - Return `CollectionResult`
//!
//! # Error Handling
//!
//! Query failures are non-fatal: they are logged, the data set is skipped for
//! this cycle and `Ok(CollectionStatus::Failed)` is returned. Errors for which
//! [`MonitorError::is_fatal`] holds propagate as `Err` and stop the poller.

use crate::cinc::StatusCommand;
use crate::emitter::MetricNames;
use crate::error::MonitorError;
use crate::metrics::MetricsCollector;
use crate::staleness::FreshnessWindow;
use std::future::Future;
use tracing::{info, warn};

/// Shared context passed to all collectors
///
/// All fields are immutable references, so no invariants can be violated.
pub struct CollectionContext<'a, N, S> {
    /// Source of node snapshots (the CINC database)
    pub nodes: &'a N,
    /// Status command producing service states
    pub status: &'a StatusCommand,
    /// Destination for Graphite points
    pub sink: &'a S,
    /// Metric naming scheme
    pub names: &'a MetricNames,
    /// Self-instrumentation metrics
    pub metrics: &'a MetricsCollector,
    /// Freshness window for stale node classification
    pub window: FreshnessWindow,
}

impl<N, S> Clone for CollectionContext<'_, N, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N, S> Copy for CollectionContext<'_, N, S> {}

/// Status of a metrics collection operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    /// Data was collected and its points were handed to the sink
    Success,
    /// Collection failed but is non-fatal (already logged as warning)
    Failed,
}

/// Result type for collector functions
///
/// - `Ok(CollectionStatus::Success)` = Collection succeeded
/// - `Ok(CollectionStatus::Failed)` = Collection failed but non-fatal (logged as warning)
/// - `Err(_)` = Fatal error (should propagate)
pub type CollectionResult = Result<CollectionStatus, anyhow::Error>;

/// Helper to reduce boilerplate in collectors
///
/// Wraps queries with consistent error handling:
/// - On success: runs `process` on the data, logs, returns `CollectionStatus::Success`
/// - On a fatal error: returns `Err`
/// - On any other error: logs a warning, returns `CollectionStatus::Failed`
///
/// # Arguments
///
/// * `name` - Name of the data set being collected (for logging)
/// * `query_future` - Query that returns data
/// * `process` - Async function that emits the data
pub async fn collect_with_handler<T, F, P, Fut>(
    name: &str,
    query_future: F,
    process: P,
) -> CollectionResult
where
    F: Future<Output = Result<T, MonitorError>>,
    P: FnOnce(T) -> Fut,
    Fut: Future<Output = ()>,
{
    match query_future.await {
        Ok(data) => {
            process(data).await;
            info!("{} metrics have been sent", name);
            Ok(CollectionStatus::Success)
        }
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            warn!("Failed to query {}: {}", name, e);
            Ok(CollectionStatus::Failed)
        }
    }
}

// Collector modules
pub mod nodes;
pub mod service;

// Re-export collector functions for convenient access
pub use nodes::collect_node_metrics;
pub use service::collect_service_metrics;
