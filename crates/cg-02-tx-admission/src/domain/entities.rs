//! # Domain Entities
//!
//! A pending transaction, its per-transaction admission state, and the
//! record persisted while it is in flight.

use serde::{Deserialize, Serialize};
use shared_types::{ClusterLayout, NodeHandle, ReplicaId, ShardId, Timestamp, TxId, VectorClock};
use std::time::Duration;
use tokio::time::Instant;

use super::errors::AdmissionError;
use super::value_objects::{
    AbortReason, AckProgress, AdmissionStatus, GraphUpdate, ShardBits,
};

/// A client-submitted write with its proposed timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    /// Transaction id.
    pub id: TxId,
    /// Proposed timestamp; its replica is the coordinator.
    pub timestamp: Timestamp,
    /// Ordered update list.
    pub updates: Vec<GraphUpdate>,
    /// Shards that must acknowledge before commit.
    pub touched: ShardBits,
}

impl PendingTransaction {
    /// Build a transaction and compute its touched shards.
    ///
    /// Rejects an empty update list, shards outside `layout`, and a
    /// timestamp whose clock does not match the layout.
    pub fn new(
        id: TxId,
        timestamp: Timestamp,
        updates: Vec<GraphUpdate>,
        layout: &ClusterLayout,
    ) -> Result<Self, AdmissionError> {
        if updates.is_empty() {
            return Err(AdmissionError::InvalidUpdate(format!(
                "{} has no updates",
                id
            )));
        }
        if timestamp.clock.len() != layout.clock_len() {
            return Err(AdmissionError::InvalidUpdate(format!(
                "timestamp has {} slots, layout expects {}",
                timestamp.clock.len(),
                layout.clock_len()
            )));
        }
        if !layout.contains_replica(timestamp.replica) {
            return Err(AdmissionError::InvalidUpdate(format!(
                "coordinator {} outside layout",
                timestamp.replica
            )));
        }

        let mut touched = ShardBits::new(layout.num_shards);
        for update in &updates {
            for shard in update.mentioned_shards() {
                if !layout.contains_shard(shard) {
                    return Err(AdmissionError::InvalidUpdate(format!(
                        "{} names shard {} outside layout of {}",
                        update.kind(),
                        shard,
                        layout.num_shards
                    )));
                }
            }
            touched.insert(update.shard());
        }

        Ok(Self {
            id,
            timestamp,
            updates,
            touched,
        })
    }

    /// Coordinator replica that timestamped the transaction.
    pub fn coordinator(&self) -> ReplicaId {
        self.timestamp.replica
    }

    /// Proposed clock.
    pub fn clock(&self) -> &VectorClock {
        &self.timestamp.clock
    }
}

/// Record stored while a transaction is in flight, keyed by transaction id.
///
/// The payload is the bincode-encoded [`PendingTransaction`], which lets a
/// backup coordinator resume tracking it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// Transaction id.
    pub tx_id: TxId,
    /// Coordinator that admitted the transaction.
    pub coordinator: ReplicaId,
    /// Encoded transaction.
    pub payload: Vec<u8>,
}

impl TxRecord {
    /// Encode a transaction.
    pub fn encode(tx: &PendingTransaction) -> Result<Self, AdmissionError> {
        let payload =
            bincode::serialize(tx).map_err(|e| AdmissionError::Codec(e.to_string()))?;
        Ok(Self {
            tx_id: tx.id,
            coordinator: tx.coordinator(),
            payload,
        })
    }

    /// Decode the transaction back.
    pub fn decode(&self) -> Result<PendingTransaction, AdmissionError> {
        let tx: PendingTransaction = bincode::deserialize(&self.payload)
            .map_err(|e| AdmissionError::Codec(e.to_string()))?;
        if tx.id != self.tx_id {
            return Err(AdmissionError::Codec(format!(
                "record keyed {} holds {}",
                self.tx_id, tx.id
            )));
        }
        Ok(tx)
    }
}

/// Everything one admitted transaction writes, applied by the store as a
/// single compare-and-set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteSet {
    /// Record to keep until the transaction finishes.
    pub record: TxRecord,
    /// Timestamp the transaction was admitted with.
    pub timestamp: Timestamp,
    /// Nodes read during admission with the clock ordering was checked
    /// against. Each must still carry that clock.
    pub observed: Vec<(NodeHandle, Timestamp)>,
    /// Nodes that must not exist yet.
    pub creates: Vec<NodeHandle>,
    /// Nodes removed when the transaction commits.
    pub deletes: Vec<NodeHandle>,
    /// Nodes whose last-update clock becomes `timestamp`.
    pub written: Vec<NodeHandle>,
}

/// What an external recovery process needs after an abort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortReport {
    /// Aborted transaction.
    pub tx_id: TxId,
    /// Why it was aborted.
    pub reason: AbortReason,
    /// Shards that had already acknowledged (may hold partial writes).
    pub acknowledged: Vec<ShardId>,
    /// The update list, for compensation.
    pub updates: Vec<GraphUpdate>,
}

/// Result of [`submit`](crate::ports::TransactionAdmissionApi::submit).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Ordered and persisted; waiting on these shards.
    Admitted {
        /// Shards that must acknowledge.
        awaiting: Vec<ShardId>,
    },
    /// Resubmit with a timestamp strictly later than `floor`.
    Retry {
        /// The rejected clock.
        floor: VectorClock,
    },
    /// Aborted before admission.
    Aborted(AbortReport),
}

impl SubmitOutcome {
    /// True for [`SubmitOutcome::Admitted`].
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// Per-transaction admission counters.
#[derive(Clone, Debug)]
pub struct AdmissionState {
    /// The transaction.
    pub tx: PendingTransaction,
    /// Acknowledgements received.
    pub ack_count: usize,
    /// Shards that acknowledged.
    pub acked: ShardBits,
    /// Current state.
    pub status: AdmissionStatus,
    admitted: bool,
    admitted_at: Instant,
}

impl AdmissionState {
    /// Fresh OPEN state, not yet admitted.
    pub fn new(tx: PendingTransaction) -> Self {
        let acked = ShardBits::new(tx.touched.capacity());
        Self {
            tx,
            ack_count: 0,
            acked,
            status: AdmissionStatus::Open,
            admitted: false,
            admitted_at: Instant::now(),
        }
    }

    /// OPEN state for a transaction admitted earlier (backup recovery).
    pub fn restored(tx: PendingTransaction) -> Self {
        let mut state = Self::new(tx);
        state.mark_admitted();
        state
    }

    /// Ordering and persistence succeeded; acknowledgements may arrive.
    pub fn mark_admitted(&mut self) {
        self.admitted = true;
        self.admitted_at = Instant::now();
    }

    /// Whether the transaction has been ordered and persisted.
    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    /// Transition to a new state.
    pub fn transition_to(&mut self, next: AdmissionStatus) -> Result<(), AdmissionError> {
        if !self.status.can_transition_to(next) {
            return Err(AdmissionError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Record one shard acknowledgement.
    ///
    /// Errors leave the state unchanged.
    pub fn record_ack(&mut self, shard: ShardId) -> Result<AckProgress, AdmissionError> {
        let tx = self.tx.id;
        if !self.admitted {
            return Err(AdmissionError::NotYetAdmitted(tx));
        }
        if self.status != AdmissionStatus::Open {
            return Err(AdmissionError::InvalidTransition {
                from: self.status,
                to: AdmissionStatus::Committed,
            });
        }
        if !self.tx.touched.contains(shard) {
            return Err(AdmissionError::ShardNotTouched { tx, shard });
        }
        if !self.acked.insert(shard) {
            return Err(AdmissionError::DuplicateAck { tx, shard });
        }
        self.ack_count += 1;

        match self.remaining() {
            0 => {
                self.transition_to(AdmissionStatus::Committed)?;
                Ok(AckProgress::Committed)
            }
            remaining => Ok(AckProgress::Waiting { remaining }),
        }
    }

    /// Touched shards that have not acknowledged.
    pub fn remaining(&self) -> usize {
        self.tx.touched.count().saturating_sub(self.ack_count)
    }

    /// Shards that acknowledged, ascending.
    pub fn acknowledged(&self) -> Vec<ShardId> {
        self.acked.shards()
    }

    /// Shards still to acknowledge, ascending.
    pub fn pending_shards(&self) -> Vec<ShardId> {
        self.tx.touched.difference(&self.acked)
    }

    /// Admitted longer than `timeout` ago without completing.
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.admitted && self.admitted_at.elapsed() >= timeout
    }

    /// Move to ABORTED and describe what must be compensated.
    pub fn abort(&mut self, reason: AbortReason) -> Result<AbortReport, AdmissionError> {
        self.transition_to(AdmissionStatus::Aborted)?;
        Ok(AbortReport {
            tx_id: self.tx.id,
            reason,
            acknowledged: self.acknowledged(),
            updates: self.tx.updates.clone(),
        })
    }
}
