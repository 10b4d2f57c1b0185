//! # Replica Timestamper
//!
//! Each coordinator replica owns one counter slot of every vector clock.
//! The timestamper holds the replica's current clock and hands out new,
//! strictly increasing timestamps.

use parking_lot::Mutex;
use shared_types::{ClockError, ClusterLayout, ReplicaId, Timestamp, VectorClock};
use std::cmp::Ordering;

use super::errors::AdmissionError;

/// Clock source for one coordinator replica.
pub struct Timestamper {
    replica: ReplicaId,
    clock: Mutex<VectorClock>,
}

impl Timestamper {
    /// Start at zero counters in `epoch`.
    pub fn new(
        replica: ReplicaId,
        layout: &ClusterLayout,
        epoch: u64,
    ) -> Result<Self, AdmissionError> {
        layout.validate()?;
        if !layout.contains_replica(replica) {
            return Err(AdmissionError::InvalidConfig(format!(
                "replica {} outside layout of {} replicas",
                replica, layout.num_replicas
            )));
        }
        Ok(Self {
            replica,
            clock: Mutex::new(VectorClock::zero(epoch, layout.num_replicas)),
        })
    }

    /// Replica this timestamper belongs to.
    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    /// Current clock (last one handed out or observed).
    pub fn current(&self) -> VectorClock {
        self.clock.lock().clone()
    }

    /// Advance the replica's own counter and return the new timestamp.
    pub fn next_timestamp(&self) -> Result<Timestamp, ClockError> {
        let mut clock = self.clock.lock();
        let next = clock.incremented(self.replica)?;
        *clock = next.clone();
        Ok(Timestamp::new(self.replica, next))
    }

    /// Merge a clock seen from another replica.
    ///
    /// A newer epoch replaces the local clock; an older one is ignored.
    pub fn observe(&self, seen: &VectorClock) -> Result<(), ClockError> {
        let mut clock = self.clock.lock();
        Self::observe_locked(&mut clock, seen)
    }

    /// Timestamp strictly later than `floor`.
    pub fn next_after(&self, floor: &VectorClock) -> Result<Timestamp, ClockError> {
        let mut clock = self.clock.lock();
        Self::observe_locked(&mut clock, floor)?;
        let next = clock.incremented(self.replica)?;
        *clock = next.clone();
        Ok(Timestamp::new(self.replica, next))
    }

    /// Start a new membership period with zeroed counters.
    ///
    /// Ignored unless `epoch` is newer than the current one.
    pub fn advance_epoch(&self, epoch: u64) {
        let mut clock = self.clock.lock();
        if epoch > clock.epoch() {
            *clock = VectorClock::zero(epoch, clock.counters().len());
        }
    }

    fn observe_locked(clock: &mut VectorClock, seen: &VectorClock) -> Result<(), ClockError> {
        match seen.epoch().cmp(&clock.epoch()) {
            Ordering::Less => Ok(()),
            Ordering::Greater => {
                if seen.len() != clock.len() {
                    return Err(ClockError::LengthMismatch {
                        lhs: clock.len(),
                        rhs: seen.len(),
                    });
                }
                *clock = seen.clone();
                Ok(())
            }
            Ordering::Equal => {
                *clock = clock.merged(seen)?;
                Ok(())
            }
        }
    }
}
