//! # Causal-Graph Telemetry
//!
//! Structured logging for the causal-graph subsystems.
//!
//! Library crates only emit `tracing` events; the process that embeds them
//! calls [`init_tracing`] once at startup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cg_telemetry::{init_tracing, TelemetryConfig};
//!
//! fn main() {
//!     let config = TelemetryConfig::for_subsystem("02", "tx-admission");
//!     init_tracing(&config).expect("Failed to init tracing");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CG_SERVICE_NAME` | `causal-graph` | Service name in log lines |
//! | `CG_SUBSYSTEM_ID` | `00` | Subsystem identifier |
//! | `CG_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `CG_JSON_LOGS` | `true` in containers | JSON output |
//! | `CG_LOG_SOURCE` | `false` | File and line in events |

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{build_filter, init_for_tests, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// A global subscriber is already installed.
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,

    /// The log filter directive could not be parsed.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),
}
