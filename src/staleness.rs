//! Node Staleness Classification
//!
//! A node is stale when its `updated_at` is at or before `now - window`.
//! The same [`FreshnessWindow`] drives the filter, the log text and the
//! `nodes.last_updated_<window>_ago` metric name, so they cannot disagree.

use crate::cinc::types::{Node, NodeSnapshot};
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// How recently a node must have checked in to count as in sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessWindow {
    minutes: u64,
}

impl FreshnessWindow {
    pub fn from_minutes(minutes: u64) -> Self {
        Self { minutes }
    }

    /// `None` when the window is too large to represent
    pub fn duration(&self) -> Option<Duration> {
        i64::try_from(self.minutes)
            .ok()
            .and_then(Duration::try_minutes)
    }

    /// Segment used in metric names, e.g. `1_hour`, `2_hours`, `90_minutes`
    pub fn metric_segment(&self) -> String {
        self.to_string().replace(' ', "_")
    }
}

impl Default for FreshnessWindow {
    fn default() -> Self {
        Self::from_minutes(60)
    }
}

impl fmt::Display for FreshnessWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (amount, unit) = if self.minutes % 60 == 0 {
            (self.minutes / 60, "hour")
        } else {
            (self.minutes, "minute")
        };
        let plural = if amount == 1 { "" } else { "s" };
        write!(f, "{} {}{}", amount, unit, plural)
    }
}

/// All nodes and the stale subset, in snapshot order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeClassification {
    pub nodes: Vec<Node>,
    pub stale: Vec<Node>,
    pub window: FreshnessWindow,
}

impl NodeClassification {
    pub fn registered_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn stale_count(&self) -> usize {
        self.stale.len()
    }
}

/// Whether `node` missed the window ending at `now`
pub fn is_stale(node: &Node, now: DateTime<Utc>, window: FreshnessWindow) -> bool {
    match window
        .duration()
        .and_then(|window| now.checked_sub_signed(window))
    {
        Some(cutoff) => node.updated_at <= cutoff,
        None => false,
    }
}

/// Split a snapshot into all nodes and those not updated within `window`.
///
/// Pure: the same snapshot always yields the same stale set.
pub fn classify(snapshot: &NodeSnapshot, window: FreshnessWindow) -> NodeClassification {
    let stale = snapshot
        .nodes
        .iter()
        .filter(|node| is_stale(node, snapshot.taken_at, window))
        .cloned()
        .collect();

    NodeClassification {
        nodes: snapshot.nodes.clone(),
        stale,
        window,
    }
}
