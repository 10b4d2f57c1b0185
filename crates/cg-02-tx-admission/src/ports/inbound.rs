//! Inbound Ports (Driving Ports / API)

use async_trait::async_trait;
use shared_types::{ReplicaId, ShardId, TxId};

use crate::domain::{
    AbortReason, AbortReport, AckProgress, AdmissionError, AdmissionStatus, PendingTransaction,
    SubmitOutcome,
};

/// Primary Transaction Admission API
///
/// Acknowledgements for one transaction may arrive concurrently and out of
/// order; unrelated transactions never wait on each other.
#[async_trait]
pub trait TransactionAdmissionApi: Send + Sync {
    /// Order a transaction after everything it reads and persist it.
    ///
    /// This is the main entry point. It:
    /// 1. Validates the update list
    /// 2. Reads last-update clocks of the nodes it depends on
    /// 3. Asks the oracle to order the proposed timestamp after them
    /// 4. Persists its writes if nothing it read changed meanwhile, and
    ///    registers the transaction as OPEN
    async fn submit(&self, tx: PendingTransaction) -> Result<SubmitOutcome, AdmissionError>;

    /// Record a shard acknowledgement.
    async fn on_shard_ack(&self, tx: TxId, shard: ShardId) -> Result<AckProgress, AdmissionError>;

    /// A shard could not apply its updates; abort the transaction.
    async fn on_shard_failure(
        &self,
        tx: TxId,
        shard: ShardId,
        reason: String,
    ) -> Result<AbortReport, AdmissionError>;

    /// Coordinator-initiated abort of an OPEN transaction.
    async fn abort(&self, tx: TxId, reason: AbortReason) -> Result<AbortReport, AdmissionError>;

    /// Abort every transaction whose acknowledgements timed out.
    async fn abort_expired(&self) -> Vec<AbortReport>;

    /// Re-register transactions a failed coordinator had admitted.
    async fn restore_pending(&self, coordinator: ReplicaId) -> Result<Vec<TxId>, AdmissionError>;

    /// OPEN for in-flight transactions, RETRY for ones awaiting resubmission.
    fn status(&self, tx: TxId) -> Option<AdmissionStatus>;

    /// Shards that acknowledged an in-flight transaction.
    fn acknowledged_shards(&self, tx: TxId) -> Option<Vec<ShardId>>;

    /// Number of in-flight transactions.
    fn in_flight(&self) -> usize;
}
