//! Service Status Collection
//!
//! Runs the configured status command (by default `sudo cinc-server-ctl status`)
//! and folds its standard output into a [`ServiceStatusMap`].
//!
//! The child is spawned with `kill_on_drop`, so an early return while reading
//! still kills it, and the tokio runtime reaps it in the background. On the
//! normal path the exit status is awaited before returning.

use crate::cinc::parser::parse_status_line;
use crate::cinc::types::{ServiceStatusMap, StatusLine};
use crate::error::{MonitorError, Result};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Runs the external status command once per call
#[derive(Debug, Clone)]
pub struct StatusCommand {
    program: String,
    args: Vec<String>,
}

impl StatusCommand {
    /// Build from an argv list; the first element is the program.
    pub fn from_argv(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            MonitorError::Config("status command must name a program".to_string())
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Command line as a single string, for logs and errors
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command and parse every line it prints.
    ///
    /// # Errors
    ///
    /// * [`MonitorError::StatusCommandSpawn`] - the program could not be started
    /// * [`MonitorError::StatusCommandFailed`] - it exited with a non-zero status
    /// * [`MonitorError::Io`] - reading its output failed
    ///
    /// An empty map is a valid result when the command prints nothing recognizable.
    pub async fn collect(&self) -> Result<ServiceStatusMap> {
        let command = self.display();
        info!("{}:", command);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MonitorError::StatusCommandSpawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MonitorError::Io(std::io::Error::other("status command stdout not captured"))
        })?;

        let statuses = read_statuses(BufReader::new(stdout)).await?;

        let status = child.wait().await?;
        if !status.success() {
            return Err(MonitorError::StatusCommandFailed {
                command,
                status: status.to_string(),
            });
        }

        Ok(statuses)
    }
}

/// Fold status output into a map until the stream ends.
///
/// Lines are independent; unrecognized ones are skipped and a repeated
/// service keeps the value from its last line. Bytes that are not valid
/// UTF-8 are replaced, so a garbled line cannot hide its neighbours.
pub async fn read_statuses<R>(reader: R) -> Result<ServiceStatusMap>
where
    R: AsyncBufRead + Unpin,
{
    let mut statuses = ServiceStatusMap::new();
    let mut reader = reader;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        match parse_status_line(&line) {
            StatusLine::Recognized { service, state } => {
                statuses.insert(service, state);
            }
            StatusLine::Unrecognized => debug!("Skipping status line: {:?}", line),
        }
    }

    Ok(statuses)
}
