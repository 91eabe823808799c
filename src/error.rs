use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to start status command `{command}`: {source}")]
    StatusCommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Status command `{command}` exited unsuccessfully: {status}")]
    StatusCommandFailed { command: String, status: String },

    #[error("Graphite error: {0}")]
    Graphite(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Errors that leave the monitor with no useful degraded mode.
    ///
    /// A cycle hitting one of these stops the process; everything else is
    /// logged and retried on the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::StatusCommandSpawn { .. } | MonitorError::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
