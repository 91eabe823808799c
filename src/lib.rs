//! CINC Server Monitor
//!
//! Periodically reports CINC server health to Graphite: which registered nodes
//! have stopped converging, and which server services are up.
//!
//! # Overview
//!
//! Each polling cycle reads the `nodes` table of the CINC server database,
//! flags nodes not updated within the freshness window, runs
//! `cinc-server-ctl status` and parses its runit output, then sends every
//! result to Graphite as a dotted metric name and integer value.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     SQL (read-only)    ┌──────────────┐
//! │ PostgreSQL  │ ◄────────────────────  │   Monitor    │
//! │  (nodes)    │                        │              │
//! └─────────────┘                        │  ┌────────┐  │   plaintext   ┌──────────┐
//!                                        │  │Emitter │  │ ────────────► │ Graphite │
//! ┌─────────────┐    stdout (runit)      │  └────────┘  │   TCP :2003   └──────────┘
//! │cinc-server- │ ─────────────────────► │  ┌────────┐  │
//! │ctl status   │                        │  │ Parser │  │
//! └─────────────┘                        │  └────────┘  │
//!                                        └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`cinc`] - Database access, status command and output parser
//! - [`staleness`] - Freshness window and node classification
//! - [`emitter`] - Metric naming and per-point emission
//! - [`graphite`] - Graphite plaintext client
//! - [`collectors`] - Per data set collection
//! - [`metrics`] - Prometheus self-instrumentation
//! - [`server`] - Polling loop and status endpoint
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use cinc_monitor::{config::Config, server::{self, RunMode}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     server::start(config, RunMode::Continuous).await?;
//!     Ok(())
//! }
//! ```

pub mod cinc;
pub mod collectors;
pub mod config;
pub mod emitter;
pub mod error;
pub mod graphite;
pub mod metrics;
pub mod server;
pub mod staleness;
