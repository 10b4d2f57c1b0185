//! Application layer for Causal Order

pub mod service;

pub use service::{Oracle, OracleStats, OracleStatsSnapshot};
