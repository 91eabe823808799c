//! Service Status Metrics Collector
//!
//! Collects up/down status for the services supervised by the CINC server
//! (nginx, postgresql, opscode-erchef, ...).
//!
//! # Metrics Produced
//! - `<prefix>.serving[.<host>].<service>` - Service status (0=down, 1=running)

use super::{collect_with_handler, CollectionContext, CollectionResult};
use crate::emitter::{emit, service_points, MetricSink};

/// Collects service status metrics from the status command
///
/// Runs the configured status command, parses its output and sends one point
/// per recognized service. No output, or no recognizable lines, sends nothing
/// and still counts as success.
///
/// # Returns
///
/// * `Ok(CollectionStatus::Success)` - Points were handed to the sink
/// * `Ok(CollectionStatus::Failed)` - The command exited non-zero (logged as warning)
/// * `Err(_)` - The command could not be started at all
pub async fn collect_service_metrics<N, S>(ctx: &CollectionContext<'_, N, S>) -> CollectionResult
where
    S: MetricSink,
{
    collect_with_handler("Service", ctx.status.collect(), |statuses| async move {
        ctx.metrics.service_status.reset();
        for (service, state) in &statuses {
            ctx.metrics
                .service_status
                .with_label_values(&[service.as_str()])
                .set(state.code());
        }

        let report = emit(ctx.sink, &service_points(ctx.names, &statuses)).await;
        ctx.metrics.record_emit(report);
    })
    .await
}
