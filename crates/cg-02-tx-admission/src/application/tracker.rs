//! Admission Tracker
//!
//! Main service implementing [`TransactionAdmissionApi`].
//!
//! In-flight state lives in a `DashMap` keyed by transaction id, so each
//! transaction's acknowledgements are serialized by its own entry lock and
//! unrelated transactions proceed in parallel. No entry lock is held across
//! an `.await`.
//!
//! Two writers of one node are kept apart by the store: persisting is a
//! compare-and-set on the clocks read before ordering, and a conflict sends
//! the later writer back for a new timestamp.

use async_trait::async_trait;
use cg_01_causal_order::{happens_before_local, CausalOrderApi};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::{ReplicaId, ShardId, Timestamp, TxId, VectorClock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::algorithms::collect_dependencies;
use crate::config::AdmissionConfig;
use crate::domain::{
    AbortReason, AbortReport, AckProgress, AdmissionError, AdmissionState, AdmissionStatus,
    PendingTransaction, StoreError, SubmitOutcome, TxRecord, WriteSet,
};
use crate::ports::{GraphStore, TransactionAdmissionApi};

/// Statistics for the admission tracker
#[derive(Debug, Default)]
pub struct AdmissionStats {
    /// Transactions submitted
    pub submitted: AtomicU64,
    /// Transactions admitted (ordered and persisted)
    pub admitted: AtomicU64,
    /// Submissions sent back for a later timestamp
    pub retries: AtomicU64,
    /// Transactions committed
    pub committed: AtomicU64,
    /// Transactions aborted
    pub aborted: AtomicU64,
    /// Transactions re-registered by a backup coordinator
    pub restored: AtomicU64,
}

/// Admission tracker
///
/// Drives each transaction through OPEN → COMMITTED | RETRY | ABORTED.
pub struct AdmissionTracker<O: CausalOrderApi, G: GraphStore> {
    config: AdmissionConfig,
    oracle: Arc<O>,
    store: Arc<G>,
    in_flight: DashMap<TxId, AdmissionState>,
    retry_floor: DashMap<TxId, VectorClock>,
    stats: AdmissionStats,
}

impl<O: CausalOrderApi, G: GraphStore> AdmissionTracker<O, G> {
    /// Create a tracker with default config
    pub fn new(oracle: Arc<O>, store: Arc<G>) -> Self {
        Self::build(AdmissionConfig::default(), oracle, store)
    }

    /// Create a tracker with custom config
    pub fn with_config(
        config: AdmissionConfig,
        oracle: Arc<O>,
        store: Arc<G>,
    ) -> Result<Self, AdmissionError> {
        config.validate()?;
        Ok(Self::build(config, oracle, store))
    }

    fn build(config: AdmissionConfig, oracle: Arc<O>, store: Arc<G>) -> Self {
        Self {
            config,
            oracle,
            store,
            in_flight: DashMap::new(),
            retry_floor: DashMap::new(),
            stats: AdmissionStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> &AdmissionStats {
        &self.stats
    }

    /// Clock a RETRY resubmission must be strictly later than.
    pub fn retry_floor(&self, tx: TxId) -> Option<VectorClock> {
        self.retry_floor.get(&tx).map(|f| f.clone())
    }

    fn validate(&self, tx: &PendingTransaction) -> Result<(), AdmissionError> {
        if tx.updates.len() > self.config.max_updates_per_tx {
            return Err(AdmissionError::InvalidUpdate(format!(
                "{} updates exceeds limit of {}",
                tx.updates.len(),
                self.config.max_updates_per_tx
            )));
        }
        for shard in tx.touched.shards() {
            if !self.config.layout.contains_shard(shard) {
                return Err(AdmissionError::InvalidUpdate(format!(
                    "shard {} outside layout",
                    shard
                )));
            }
        }
        if tx.clock().len() != self.config.layout.clock_len() {
            return Err(AdmissionError::InvalidUpdate(format!(
                "timestamp has {} slots, layout expects {}",
                tx.clock().len(),
                self.config.layout.clock_len()
            )));
        }
        Ok(())
    }

    fn check_retry_floor(&self, tx: &PendingTransaction) -> Result<(), AdmissionError> {
        if let Some(floor) = self.retry_floor.get(&tx.id) {
            if !happens_before_local(&floor, tx.clock())? {
                return Err(AdmissionError::StaleRetryTimestamp {
                    tx: tx.id,
                    floor: floor.clone(),
                    got: tx.clock().clone(),
                });
            }
        }
        Ok(())
    }

    /// Drop a reserved entry and ask the caller for a later timestamp.
    fn send_back(&self, id: TxId, timestamp: Timestamp) -> Result<SubmitOutcome, AdmissionError> {
        if let Some((_, mut state)) = self.in_flight.remove(&id) {
            state.transition_to(AdmissionStatus::Retry)?;
        }
        self.retry_floor.insert(id, timestamp.clock.clone());
        self.stats.retries.fetch_add(1, Ordering::Relaxed);
        Ok(SubmitOutcome::Retry {
            floor: timestamp.clock,
        })
    }

    /// Map a store error met before admission to RETRY or ABORTED.
    fn store_failure(
        &self,
        id: TxId,
        timestamp: Timestamp,
        err: StoreError,
    ) -> Result<SubmitOutcome, AdmissionError> {
        let reason = match err {
            StoreError::Conflict(node) => {
                debug!(tx_id = %id, node = %node, "[cg-02] Write conflict, retry with later timestamp");
                return self.send_back(id, timestamp);
            }
            StoreError::NodeNotFound(node) => AbortReason::NodeNotFound(node),
            StoreError::NodeExists(node) => AbortReason::NodeExists(node),
            other => AbortReason::StoreFailure(other.to_string()),
        };
        self.abort_unadmitted(id, reason)
    }

    /// Drop a reserved entry and report an abort that happened before
    /// admission.
    fn abort_unadmitted(
        &self,
        id: TxId,
        reason: AbortReason,
    ) -> Result<SubmitOutcome, AdmissionError> {
        let (_, mut state) = self
            .in_flight
            .remove(&id)
            .ok_or(AdmissionError::UnknownTransaction(id))?;
        let report = state.abort(reason)?;
        self.retry_floor.remove(&id);
        self.stats.aborted.fetch_add(1, Ordering::Relaxed);
        warn!(tx_id = %id, reason = ?report.reason, "[cg-02] Transaction aborted before admission");
        Ok(SubmitOutcome::Aborted(report))
    }

    /// Remove an in-flight entry and move it to ABORTED.
    async fn finish_abort(
        &self,
        id: TxId,
        reason: AbortReason,
    ) -> Result<AbortReport, AdmissionError> {
        let (_, mut state) = self
            .in_flight
            .remove_if(&id, |_, s| s.is_admitted())
            .ok_or_else(|| {
                if self.in_flight.contains_key(&id) {
                    AdmissionError::NotYetAdmitted(id)
                } else {
                    AdmissionError::UnknownTransaction(id)
                }
            })?;
        let report = state.abort(reason)?;

        if let Err(e) = self.store.rollback_transaction(id).await {
            warn!(tx_id = %id, error = %e, "[cg-02] Failed to roll back aborted transaction");
        }
        self.stats.aborted.fetch_add(1, Ordering::Relaxed);
        warn!(
            tx_id = %id,
            reason = ?report.reason,
            acknowledged = ?report.acknowledged,
            "[cg-02] Transaction aborted"
        );
        Ok(report)
    }
}

#[async_trait]
impl<O: CausalOrderApi, G: GraphStore> TransactionAdmissionApi for AdmissionTracker<O, G> {
    async fn submit(&self, tx: PendingTransaction) -> Result<SubmitOutcome, AdmissionError> {
        // 1. Validate input
        self.validate(&tx)?;
        let deps = collect_dependencies(&tx.updates)?;
        self.check_retry_floor(&tx)?;

        let id = tx.id;
        let timestamp = tx.timestamp.clone();
        let record = TxRecord::encode(&tx)?;

        match self.in_flight.entry(id) {
            Entry::Occupied(_) => return Err(AdmissionError::DuplicateTransaction(id)),
            Entry::Vacant(slot) => {
                slot.insert(AdmissionState::new(tx));
            }
        }
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);

        debug!(
            tx_id = %id,
            timestamp = %timestamp,
            reads = deps.reads.len(),
            writes = deps.written.len(),
            "[cg-02] Ordering transaction"
        );

        // 2. Last-update clocks of everything the writes depend on
        let before = match self.store.last_update_clocks(&deps.reads).await {
            Ok(clocks) => clocks,
            Err(e) => return self.store_failure(id, timestamp, e),
        };

        // 3. Order after them
        let ordered = match self.oracle.assign_vt_order(&before, &timestamp).await {
            Ok(ordered) => ordered,
            Err(e) => {
                self.in_flight.remove(&id);
                error!(
                    tx_id = %id,
                    error = %e,
                    "[cg-02] Internal consistency violation while ordering"
                );
                return Err(e.into());
            }
        };
        if !ordered {
            debug!(
                tx_id = %id,
                floor = %timestamp.clock,
                "[cg-02] Ordering conflict, retry with later timestamp"
            );
            return self.send_back(id, timestamp);
        }

        // 4. Persist, provided nothing read in step 2 has changed
        let writes = WriteSet {
            record,
            timestamp: timestamp.clone(),
            observed: deps.reads.into_iter().zip(before).collect(),
            creates: deps.creates,
            deletes: deps.deletes,
            written: deps.written,
        };
        if let Err(e) = self.store.persist_transaction(writes).await {
            return self.store_failure(id, timestamp, e);
        }

        // 5. Open for acknowledgements
        let awaiting = match self.in_flight.get_mut(&id) {
            Some(mut state) => {
                state.mark_admitted();
                state.pending_shards()
            }
            None => return Err(AdmissionError::UnknownTransaction(id)),
        };
        self.retry_floor.remove(&id);
        self.stats.admitted.fetch_add(1, Ordering::Relaxed);

        info!(tx_id = %id, shards = ?awaiting, "[cg-02] Transaction admitted");
        Ok(SubmitOutcome::Admitted { awaiting })
    }

    async fn on_shard_ack(&self, tx: TxId, shard: ShardId) -> Result<AckProgress, AdmissionError> {
        let progress = {
            let mut state = self
                .in_flight
                .get_mut(&tx)
                .ok_or(AdmissionError::UnknownTransaction(tx))?;
            state.record_ack(shard)?
        };

        match progress {
            AckProgress::Waiting { remaining } => {
                debug!(tx_id = %tx, shard, remaining, "[cg-02] Shard acknowledged");
            }
            AckProgress::Committed => {
                self.in_flight.remove(&tx);
                if let Err(e) = self.store.commit_transaction(tx).await {
                    warn!(tx_id = %tx, error = %e, "[cg-02] Failed to finalize committed transaction");
                }
                self.stats.committed.fetch_add(1, Ordering::Relaxed);
                info!(tx_id = %tx, "[cg-02] Transaction committed");
            }
        }
        Ok(progress)
    }

    async fn on_shard_failure(
        &self,
        tx: TxId,
        shard: ShardId,
        reason: String,
    ) -> Result<AbortReport, AdmissionError> {
        {
            let state = self
                .in_flight
                .get(&tx)
                .ok_or(AdmissionError::UnknownTransaction(tx))?;
            if !state.tx.touched.contains(shard) {
                return Err(AdmissionError::ShardNotTouched { tx, shard });
            }
        }
        self.finish_abort(tx, AbortReason::ShardFailure { shard, reason })
            .await
    }

    async fn abort(&self, tx: TxId, reason: AbortReason) -> Result<AbortReport, AdmissionError> {
        self.finish_abort(tx, reason).await
    }

    async fn abort_expired(&self) -> Vec<AbortReport> {
        let timeout = self.config.ack_timeout();
        let expired: Vec<TxId> = self
            .in_flight
            .iter()
            .filter(|entry| entry.is_expired(timeout))
            .map(|entry| *entry.key())
            .collect();

        let mut reports = Vec::with_capacity(expired.len());
        for id in expired {
            match self.finish_abort(id, AbortReason::Timeout).await {
                Ok(report) => reports.push(report),
                // Committed or aborted concurrently.
                Err(e) => debug!(tx_id = %id, error = %e, "[cg-02] Skipped expired transaction"),
            }
        }
        reports
    }

    async fn restore_pending(&self, coordinator: ReplicaId) -> Result<Vec<TxId>, AdmissionError> {
        let records = self.store.pending_transactions(coordinator).await?;

        let mut restored = Vec::with_capacity(records.len());
        for record in records {
            let tx = record.decode()?;
            let id = tx.id;
            if let Entry::Vacant(slot) = self.in_flight.entry(id) {
                slot.insert(AdmissionState::restored(tx));
                restored.push(id);
            }
        }

        self.stats
            .restored
            .fetch_add(restored.len() as u64, Ordering::Relaxed);
        info!(
            coordinator = %coordinator,
            count = restored.len(),
            "[cg-02] Restored pending transactions"
        );
        Ok(restored)
    }

    fn status(&self, tx: TxId) -> Option<AdmissionStatus> {
        if let Some(state) = self.in_flight.get(&tx) {
            return Some(state.status);
        }
        self.retry_floor
            .contains_key(&tx)
            .then_some(AdmissionStatus::Retry)
    }

    fn acknowledged_shards(&self, tx: TxId) -> Option<Vec<ShardId>> {
        self.in_flight.get(&tx).map(|s| s.acknowledged())
    }

    fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
