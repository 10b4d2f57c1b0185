//! # Domain Errors
//!
//! Error types for the Transaction Admission subsystem.
//!
//! Ordering conflicts are not errors: they surface as
//! [`SubmitOutcome::Retry`](super::SubmitOutcome::Retry).

use cg_01_causal_order::CausalOrderError;
use shared_types::{ClockError, LayoutError, NodeHandle, ShardId, TxId, VectorClock};
use thiserror::Error;

use super::value_objects::AdmissionStatus;

/// Admission error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    /// The update list is malformed.
    #[error("Invalid update list: {0}")]
    InvalidUpdate(String),

    /// A transaction with this id is already in flight.
    #[error("Transaction already in flight: {0}")]
    DuplicateTransaction(TxId),

    /// No in-flight transaction with this id.
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TxId),

    /// Transaction is still being ordered and cannot take acknowledgements.
    #[error("Transaction not yet admitted: {0}")]
    NotYetAdmitted(TxId),

    /// A RETRY resubmission did not carry a strictly later timestamp.
    #[error("Stale retry timestamp for {tx}: {got} is not later than {floor}")]
    StaleRetryTimestamp {
        /// Transaction being resubmitted
        tx: TxId,
        /// Clock rejected on the previous attempt
        floor: VectorClock,
        /// Clock offered now
        got: VectorClock,
    },

    /// Acknowledgement from a shard the transaction does not touch.
    #[error("Shard {shard} is not touched by {tx}")]
    ShardNotTouched {
        /// Transaction
        tx: TxId,
        /// Offending shard
        shard: ShardId,
    },

    /// Second acknowledgement from the same shard.
    #[error("Duplicate acknowledgement from shard {shard} for {tx}")]
    DuplicateAck {
        /// Transaction
        tx: TxId,
        /// Offending shard
        shard: ShardId,
    },

    /// Invalid state transition.
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// Current state
        from: AdmissionStatus,
        /// Attempted state
        to: AdmissionStatus,
    },

    /// Causal ordering failed with an internal-consistency violation.
    #[error("Causal ordering failed: {0}")]
    Ordering(#[from] CausalOrderError),

    /// Store error outside the admission path.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Clock derivation failed.
    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    /// Cluster layout rejected.
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Transaction record could not be encoded or decoded.
    #[error("Record codec error: {0}")]
    Codec(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),
}

/// Errors reported by a graph store adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Node has never been written, or its deletion committed.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeHandle),

    /// A create names a node that already exists.
    #[error("Node already exists: {0}")]
    NodeExists(NodeHandle),

    /// Node changed since its clock was read, or an open transaction is
    /// creating or deleting it.
    #[error("Write conflict on node {0}")]
    Conflict(NodeHandle),

    /// Store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Store refused the write.
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}
