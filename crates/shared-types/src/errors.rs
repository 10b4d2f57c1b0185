//! # Error Types
//!
//! Errors raised while building, deriving or decoding shared values.

use thiserror::Error;

/// Errors from deriving one vector clock from another.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The two clocks do not have the same number of slots.
    #[error("Clock length mismatch: {lhs} != {rhs}")]
    LengthMismatch { lhs: usize, rhs: usize },

    /// The two clocks belong to different epochs.
    #[error("Clock epoch mismatch: {lhs} != {rhs}")]
    EpochMismatch { lhs: u64, rhs: u64 },

    /// A clock must carry at least the epoch slot.
    #[error("Clock has no epoch slot")]
    Empty,

    /// Replica slot outside the clock.
    #[error("Replica slot {slot} outside clock of length {len}")]
    SlotOutOfRange { slot: usize, len: usize },

    /// Replica counter is already at its maximum.
    #[error("Counter in slot {slot} would overflow")]
    CounterOverflow { slot: usize },
}

/// Errors from decoding the fixed-width clock wire format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockCodecError {
    /// Buffer length is not `expected_slots * 8`.
    #[error("Clock buffer is {got} bytes, expected {expected}")]
    WrongLength { expected: usize, got: usize },

    /// Configured clock length cannot hold an epoch.
    #[error("Clock length must be at least 1 slot")]
    ZeroSlots,
}

/// Errors from validating a `ClusterLayout`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// At least one timestamper replica is required.
    #[error("Cluster layout has no replicas")]
    NoReplicas,

    /// At least one shard is required.
    #[error("Cluster layout has no shards")]
    NoShards,

    /// Shard ids are u16.
    #[error("Too many shards: {0}")]
    TooManyShards(usize),
}
