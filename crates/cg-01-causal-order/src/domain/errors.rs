//! # Domain Errors
//!
//! Error types for the Causal Order subsystem.
//!
//! Two families live here. Internal-consistency violations mean a caller
//! bug or a corrupted clock and are never retried. Service conditions
//! (`ServiceUnavailable`, `OrderUnresolved`) are recoverable.

use thiserror::Error;

/// Errors returned by the comparator and the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CausalOrderError {
    /// Same-epoch clocks with different slot counts.
    #[error("Clock length mismatch: {lhs} != {rhs}")]
    ClockLengthMismatch {
        /// Slots in the left clock.
        lhs: usize,
        /// Slots in the right clock.
        rhs: usize,
    },

    /// Two distinct members of a comparison set are identical clocks.
    #[error("Duplicate clock at positions {first} and {second}")]
    DuplicateClock {
        /// Position of the first copy.
        first: usize,
        /// Position of the second copy.
        second: usize,
    },

    /// Ambiguous pairs sent to the order service must share one epoch.
    #[error("Epoch mismatch among ambiguous clocks: expected {expected}, got {got}")]
    EpochMismatch {
        /// Epoch of the first ambiguous clock.
        expected: u64,
        /// Offending epoch.
        got: u64,
    },

    /// No candidate minimum remains after escalation.
    #[error("Unresolved tournament: no causal minimum after escalation")]
    UnresolvedTournament,

    /// The order service answered with something the protocol forbids.
    #[error("Order service protocol violation: {0}")]
    ProtocolViolation(String),

    /// A comparison set must hold at least one clock.
    #[error("Empty clock set")]
    EmptyClockSet,

    /// The order service failed or timed out.
    #[error("Order service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Soft-fail pairs left unresolved; retry later.
    #[error("Order service left {pairs} pair(s) unresolved")]
    OrderUnresolved {
        /// Number of pairs without a verdict.
        pairs: usize,
    },

    /// Invalid oracle configuration.
    #[error("Invalid oracle configuration: {0}")]
    InvalidConfig(String),
}

impl CausalOrderError {
    /// True for violations that indicate a bug or corrupted input and must
    /// not be silently recovered.
    pub fn is_internal_consistency(&self) -> bool {
        matches!(
            self,
            Self::ClockLengthMismatch { .. }
                | Self::DuplicateClock { .. }
                | Self::EpochMismatch { .. }
                | Self::UnresolvedTournament
                | Self::ProtocolViolation(_)
                | Self::EmptyClockSet
        )
    }
}

/// Errors reported by a temporal-order service adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderServiceError {
    /// Service could not be reached.
    #[error("Order service unreachable: {0}")]
    Unavailable(String),

    /// No reply within the bounded wait.
    #[error("Order service timed out after {0}ms")]
    Timeout(u64),

    /// A batch mixed clocks from different epochs.
    #[error("Order batch mixes epochs {first} and {other}")]
    MixedEpochs {
        /// Epoch of the first request.
        first: u64,
        /// Conflicting epoch.
        other: u64,
    },

    /// The service could not order a hard (non soft-fail) pair.
    #[error("Order service rejected batch: {0}")]
    Rejected(String),
}
