//! Outbound Ports (Driven Ports / SPI)
//!
//! The key-value store that holds nodes, edges and in-flight transaction
//! records. Strong read-your-writes consistency per shard is assumed.

use async_trait::async_trait;
use shared_types::{NodeHandle, ReplicaId, Timestamp, TxId};

use crate::domain::{StoreError, TxRecord, WriteSet};

/// Graph store boundary
///
/// A node an open transaction creates or deletes is held by that
/// transaction until it commits or rolls back. Other transactions see
/// [`StoreError::Conflict`] for it.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Last-update timestamp of each node, in argument order.
    ///
    /// An unknown node fails with [`StoreError::NodeNotFound`], a held one
    /// with [`StoreError::Conflict`].
    async fn last_update_clocks(&self, nodes: &[NodeHandle]) -> Result<Vec<Timestamp>, StoreError>;

    /// Atomically check and apply the writes of an admitted transaction.
    ///
    /// Fails with [`StoreError::Conflict`] if an observed node no longer
    /// carries the observed clock or is held, and with
    /// [`StoreError::NodeExists`] if a created node already exists. On
    /// failure nothing is written.
    async fn persist_transaction(&self, writes: WriteSet) -> Result<(), StoreError>;

    /// Make a transaction's writes final: release held nodes, remove
    /// deleted ones and drop the record.
    async fn commit_transaction(&self, tx: TxId) -> Result<(), StoreError>;

    /// Undo a transaction's writes and drop the record.
    ///
    /// Created nodes disappear, deleted ones come back, and every node
    /// whose clock this transaction set gets its previous clock back unless
    /// a later writer has replaced it.
    async fn rollback_transaction(&self, tx: TxId) -> Result<(), StoreError>;

    /// Records still stored for `coordinator`, ordered by transaction id.
    async fn pending_transactions(&self, coordinator: ReplicaId)
        -> Result<Vec<TxRecord>, StoreError>;
}
