//! Node Sync Metrics Collector
//!
//! Reports which nodes have stopped checking in with the CINC server.
//!
//! # Metrics Produced
//! - `<prefix>.notinsync.<node>` - `1` for every stale node
//! - `<prefix>.nodes.registered` - number of registered nodes
//! - `<prefix>.nodes.last_updated_<window>_ago` - number of stale nodes

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::cinc::NodeSource;
use crate::emitter::{count_value, emit, node_points, MetricSink};
use crate::staleness::classify;
use tracing::{info, warn};

/// Collects node registration and staleness metrics
///
/// Takes one snapshot of the `nodes` table, classifies it against the
/// configured freshness window and sends the resulting points.
///
/// # Returns
///
/// * `Ok(CollectionStatus::Success)` - Points were handed to the sink
/// * `Ok(CollectionStatus::Failed)` - The query failed; nothing was sent this cycle
/// * `Err(_)` - Fatal error that should propagate
pub async fn collect_node_metrics<N, S>(ctx: &CollectionContext<'_, N, S>) -> CollectionResult
where
    N: NodeSource,
    S: MetricSink,
{
    collect_with_handler("Nodes", ctx.nodes.snapshot(), |snapshot| async move {
        let classification = classify(&snapshot, ctx.window);

        info!("Registered nodes count: {}", classification.registered_count());
        info!("Not in sync node count: {}", classification.stale_count());
        for node in &classification.stale {
            warn!(
                "Node {} was last updated more than {} ago",
                node.name, classification.window
            );
        }

        ctx.metrics
            .nodes_registered
            .set(count_value(classification.registered_count()));
        ctx.metrics
            .nodes_stale
            .set(count_value(classification.stale_count()));

        let report = emit(ctx.sink, &node_points(ctx.names, &classification)).await;
        ctx.metrics.record_emit(report);
    })
    .await
}
