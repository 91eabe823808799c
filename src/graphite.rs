//! Graphite Plaintext Client
//!
//! Sends metric points to Carbon using the plaintext protocol:
//! `<name> <value> <unix_timestamp>\n` over TCP (port 2003 by default).
//!
//! A single connection is kept open and reused. When a write fails the
//! connection is dropped and the next point opens a new one; the failed
//! point itself is not resent. Writes have no timeout.

use crate::config::GraphiteConfig;
use crate::emitter::{MetricPoint, MetricSink};
use crate::error::{MonitorError, Result};
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Client for a Carbon plaintext listener
pub struct GraphiteClient {
    addr: String,
    connection: Mutex<Option<TcpStream>>,
}

impl GraphiteClient {
    /// Connect immediately; an unreachable backend is an error.
    pub async fn connect(config: &GraphiteConfig) -> Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        info!("Connecting to Graphite at {}...", addr);
        let stream = open(&addr).await?;
        info!("Connected to Graphite at {}", addr);

        Ok(Self {
            addr,
            connection: Mutex::new(Some(stream)),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn write_line(&self, line: &str) -> Result<()> {
        let mut conn_guard = self.connection.lock().await;

        if conn_guard.is_none() {
            debug!("Reconnecting to Graphite at {}", self.addr);
            *conn_guard = Some(open(&self.addr).await?);
        }

        if let Some(stream) = conn_guard.as_mut() {
            if let Err(e) = stream.write_all(line.as_bytes()).await {
                warn!("Graphite write failed, dropping connection: {}", e);
                *conn_guard = None;
                return Err(MonitorError::Graphite(format!(
                    "write to {} failed: {}",
                    self.addr, e
                )));
            }
        }

        Ok(())
    }
}

impl MetricSink for GraphiteClient {
    async fn send(&self, point: &MetricPoint) -> Result<()> {
        let line = format_line(point, Utc::now().timestamp())?;
        self.write_line(&line).await
    }
}

async fn open(addr: &str) -> Result<TcpStream> {
    TcpStream::connect(addr)
        .await
        .map_err(|e| MonitorError::Graphite(format!("cannot connect to {}: {}", addr, e)))
}

/// Render one plaintext protocol line.
///
/// Names that are empty or contain whitespace would corrupt the stream and
/// are rejected.
pub fn format_line(point: &MetricPoint, timestamp: i64) -> Result<String> {
    if point.name.is_empty() || point.name.chars().any(char::is_whitespace) {
        return Err(MonitorError::Graphite(format!(
            "invalid metric name {:?}",
            point.name
        )));
    }
    Ok(format!("{} {} {}\n", point.name, point.value, timestamp))
}
