//! CINC Server Data Types
//!
//! Rows read from the CINC server database and the values produced from
//! `cinc-server-ctl status` output.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A host registered with the CINC server (`nodes` table row)
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Node {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub environment: String,
}

/// Nodes read in one query together with the database clock at read time
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub nodes: Vec<Node>,
    pub taken_at: DateTime<Utc>,
}

/// Supervisor state of a single service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    Running,
    Down,
}

impl ServiceState {
    /// Numeric code sent to Graphite (1=running, 0=down)
    pub fn code(self) -> i64 {
        match self {
            ServiceState::Running => 1,
            ServiceState::Down => 0,
        }
    }
}

/// Verdict for one line of status output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    Recognized { service: String, state: ServiceState },
    Unrecognized,
}

/// Service name to state, last line wins on duplicates
pub type ServiceStatusMap = HashMap<String, ServiceState>;
