//! CINC Server Database Access
//!
//! Read-only queries against the CINC server's PostgreSQL `nodes` table.
//!
//! Timestamps are cast to `timestamptz` in SQL and the snapshot carries the
//! database's own `current_timestamp`, so staleness is judged on one clock.
//! Queries have no timeout: a hung database stalls the poller.

use crate::cinc::types::{Node, NodeSnapshot};
use crate::config::DatabaseConfig;
use crate::error::Result;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use tracing::info;

const SELECT_NODES: &str = "SELECT name, \
     created_at::timestamptz AS created_at, \
     updated_at::timestamptz AS updated_at, \
     environment \
     FROM nodes";

const SELECT_NOW: &str = "SELECT current_timestamp";

/// Anything that can produce a node snapshot
pub trait NodeSource {
    fn snapshot(&self) -> impl Future<Output = Result<NodeSnapshot>> + Send;
}

/// Read-only handle to the nodes table
#[derive(Clone)]
pub struct NodeStore {
    pool: PgPool,
}

impl NodeStore {
    /// Open the pool and verify the database answers.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to the CINC server database...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.url.expose_secret())
            .await?;
        info!("Connected to the CINC server database");
        Ok(Self { pool })
    }

    /// All registered nodes
    pub async fn query_nodes(&self) -> Result<Vec<Node>> {
        let nodes = sqlx::query_as::<_, Node>(SELECT_NODES)
            .fetch_all(&self.pool)
            .await?;
        Ok(nodes)
    }

    /// Current time according to the database
    pub async fn query_now(&self) -> Result<DateTime<Utc>> {
        let now = sqlx::query_scalar::<_, DateTime<Utc>>(SELECT_NOW)
            .fetch_one(&self.pool)
            .await?;
        Ok(now)
    }

    /// Close all pooled connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl NodeSource for NodeStore {
    /// Nodes plus the clock reading they are compared against
    async fn snapshot(&self) -> Result<NodeSnapshot> {
        let nodes = self.query_nodes().await?;
        let taken_at = self.query_now().await?;
        Ok(NodeSnapshot { nodes, taken_at })
    }
}
