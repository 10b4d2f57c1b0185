//! # Vector Clocks
//!
//! A vector clock is a fixed-length sequence of u64 slots. Slot 0 is the
//! epoch (coordinator-set membership period); slot `r + 1` is the counter of
//! timestamper replica `r`.
//!
//! Clocks are immutable once assigned. Deriving a later clock always
//! allocates a new value, so a clock can be shared across threads without
//! locking.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::ReplicaId;
use crate::errors::ClockError;

/// Index of the epoch inside the slot vector.
pub const EPOCH_SLOT: usize = 0;

/// Epoch followed by one counter per timestamper replica.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u64>", into = "Vec<u64>")]
pub struct VectorClock {
    slots: Vec<u64>,
}

impl VectorClock {
    /// Build a clock from an epoch and per-replica counters.
    pub fn new(epoch: u64, counters: Vec<u64>) -> Self {
        let mut slots = Vec::with_capacity(counters.len() + 1);
        slots.push(epoch);
        slots.extend(counters);
        Self { slots }
    }

    /// All-zero counters for `num_replicas` replicas in `epoch`.
    pub fn zero(epoch: u64, num_replicas: usize) -> Self {
        Self::new(epoch, vec![0; num_replicas])
    }

    /// Build a clock from raw slots (slot 0 = epoch).
    pub fn from_slots(slots: Vec<u64>) -> Result<Self, ClockError> {
        if slots.is_empty() {
            return Err(ClockError::Empty);
        }
        Ok(Self { slots })
    }

    /// Membership period this clock was assigned in.
    pub fn epoch(&self) -> u64 {
        self.slots[EPOCH_SLOT]
    }

    /// Per-replica counters, without the epoch.
    pub fn counters(&self) -> &[u64] {
        &self.slots[EPOCH_SLOT + 1..]
    }

    /// Counter owned by `replica`, if the clock has that slot.
    pub fn counter(&self, replica: ReplicaId) -> Option<u64> {
        self.slots.get(replica.slot()).copied()
    }

    /// Raw slots including the epoch.
    pub fn as_slots(&self) -> &[u64] {
        &self.slots
    }

    /// Total number of slots (epoch + counters).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false: a clock carries at least its epoch.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// New clock with `replica`'s counter advanced by one.
    pub fn incremented(&self, replica: ReplicaId) -> Result<Self, ClockError> {
        let slot = replica.slot();
        if slot >= self.slots.len() {
            return Err(ClockError::SlotOutOfRange {
                slot,
                len: self.slots.len(),
            });
        }
        let mut slots = self.slots.clone();
        slots[slot] = slots[slot]
            .checked_add(1)
            .ok_or(ClockError::CounterOverflow { slot })?;
        Ok(Self { slots })
    }

    /// New clock holding the point-wise maximum of both clocks.
    ///
    /// Both clocks must share length and epoch.
    pub fn merged(&self, other: &Self) -> Result<Self, ClockError> {
        if self.len() != other.len() {
            return Err(ClockError::LengthMismatch {
                lhs: self.len(),
                rhs: other.len(),
            });
        }
        if self.epoch() != other.epoch() {
            return Err(ClockError::EpochMismatch {
                lhs: self.epoch(),
                rhs: other.epoch(),
            });
        }
        let slots = self
            .slots
            .iter()
            .zip(other.slots.iter())
            .map(|(a, b)| *a.max(b))
            .collect();
        Ok(Self { slots })
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[e{}|", self.epoch())?;
        for (i, c) in self.counters().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", c)?;
        }
        f.write_str("]")
    }
}

impl TryFrom<Vec<u64>> for VectorClock {
    type Error = ClockError;

    fn try_from(slots: Vec<u64>) -> Result<Self, Self::Error> {
        Self::from_slots(slots)
    }
}

impl From<VectorClock> for Vec<u64> {
    fn from(clock: VectorClock) -> Self {
        clock.slots
    }
}

impl AsRef<VectorClock> for VectorClock {
    fn as_ref(&self) -> &VectorClock {
        self
    }
}

/// A vector clock together with the replica that assigned it.
///
/// The replica id travels with the clock to the temporal-order service,
/// which uses it to identify the two sides of an ordering request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    /// Replica that assigned the clock.
    pub replica: ReplicaId,
    /// The assigned clock.
    pub clock: VectorClock,
}

impl Timestamp {
    /// Pair a clock with its assigning replica.
    pub fn new(replica: ReplicaId, clock: VectorClock) -> Self {
        Self { replica, clock }
    }

    /// Epoch of the underlying clock.
    pub fn epoch(&self) -> u64 {
        self.clock.epoch()
    }
}

impl AsRef<VectorClock> for Timestamp {
    fn as_ref(&self) -> &VectorClock {
        &self.clock
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.clock, self.replica)
    }
}
