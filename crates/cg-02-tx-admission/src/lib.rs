//! # CG-02: Transaction Admission Subsystem
//!
//! Decides whether a coordinator may commit a multi-shard graph write, and
//! tracks shard acknowledgements until the write is committed or aborted.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Admission Flow
//!
//! ```text
//! submit(tx) ──► validate ──► read last-update clocks ──► assign_vt_order
//!                                                          │
//!                      false ◄──────────────────────────────┤
//!                        │                                  ▼ true
//!                      RETRY ◄── conflict ──── persist writes if reads unchanged
//!                                                           │
//!                                                           ▼
//!                                                         OPEN
//!                                     shard ack × touched ──┼── shard failure
//!                                                           ▼        │
//!                                                       COMMITTED  ABORTED
//! ```
//!
//! ## State Machine
//!
//! | From | To | Trigger |
//! |------|----|---------|
//! | OPEN | COMMITTED | last touched shard acknowledged |
//! | OPEN | RETRY | a dependency is not provably earlier, or changed before persist |
//! | OPEN | ABORTED | store or shard failure, timeout, coordinator abort |
//!
//! A RETRY resubmission must carry a strictly later timestamp. Writes become
//! final on COMMITTED and are rolled back on ABORTED.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::InMemoryGraphStore;
pub use algorithms::{collect_dependencies, Dependencies};
pub use application::{AdmissionStats, AdmissionTracker};
pub use config::AdmissionConfig;
pub use domain::{
    AbortReason, AbortReport, AckProgress, AdmissionError, AdmissionState, AdmissionStatus,
    GraphUpdate, NodeRef, PendingTransaction, ShardBits, StoreError, SubmitOutcome, Timestamper,
    TxRecord, WriteSet,
};
pub use ports::{GraphStore, TransactionAdmissionApi};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
