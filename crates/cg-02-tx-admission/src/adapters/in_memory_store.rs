//! # In-Memory Graph Store
//!
//! Keeps node clocks, transaction records and undo journals in process
//! memory. Reads and writes can be made to fail on demand to exercise abort
//! paths.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{NodeHandle, ReplicaId, Timestamp, TxId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::domain::{StoreError, TxRecord, WriteSet};
use crate::ports::GraphStore;

struct NodeState {
    last_update: Timestamp,
    /// Open transaction creating or deleting this node.
    held_by: Option<TxId>,
}

/// What a persisted transaction changed, so it can be undone.
struct Journal {
    timestamp: Timestamp,
    /// Clock each written node had before, `None` for created nodes.
    prior: Vec<(NodeHandle, Option<Timestamp>)>,
    deletes: Vec<NodeHandle>,
}

#[derive(Default)]
struct Inner {
    nodes: HashMap<NodeHandle, NodeState>,
    records: BTreeMap<TxId, TxRecord>,
    journals: HashMap<TxId, Journal>,
}

impl Inner {
    fn check(&self, writes: &WriteSet) -> Result<(), StoreError> {
        for (node, seen) in &writes.observed {
            match self.nodes.get(node) {
                None => return Err(StoreError::NodeNotFound(node.clone())),
                Some(state) if state.held_by.is_some() || state.last_update != *seen => {
                    return Err(StoreError::Conflict(node.clone()))
                }
                Some(_) => {}
            }
        }
        for node in &writes.creates {
            match self.nodes.get(node) {
                Some(state) if state.held_by.is_some() => {
                    return Err(StoreError::Conflict(node.clone()))
                }
                Some(_) => return Err(StoreError::NodeExists(node.clone())),
                None => {}
            }
        }
        Ok(())
    }
}

/// Graph store backed by maps behind one lock.
#[derive(Default)]
pub struct InMemoryGraphStore {
    inner: RwLock<Inner>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryGraphStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a node exist with the given last-update timestamp.
    pub fn seed_node(&self, node: NodeHandle, timestamp: Timestamp) {
        self.inner.write().nodes.insert(
            node,
            NodeState {
                last_update: timestamp,
                held_by: None,
            },
        );
    }

    /// Last-update timestamp of one node.
    pub fn last_update(&self, node: &NodeHandle) -> Option<Timestamp> {
        self.inner
            .read()
            .nodes
            .get(node)
            .map(|s| s.last_update.clone())
    }

    /// Open transaction currently creating or deleting `node`.
    pub fn held_by(&self, node: &NodeHandle) -> Option<TxId> {
        self.inner.read().nodes.get(node).and_then(|s| s.held_by)
    }

    /// Stored record of a transaction.
    pub fn record(&self, tx: TxId) -> Option<TxRecord> {
        self.inner.read().records.get(&tx).cloned()
    }

    /// Number of stored transaction records.
    pub fn record_count(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Make every read fail with [`StoreError::Unavailable`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with [`StoreError::WriteRejected`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("writes disabled".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn last_update_clocks(&self, nodes: &[NodeHandle]) -> Result<Vec<Timestamp>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        let inner = self.inner.read();
        nodes
            .iter()
            .map(|n| match inner.nodes.get(n) {
                None => Err(StoreError::NodeNotFound(n.clone())),
                Some(state) if state.held_by.is_some() => Err(StoreError::Conflict(n.clone())),
                Some(state) => Ok(state.last_update.clone()),
            })
            .collect()
    }

    async fn persist_transaction(&self, writes: WriteSet) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut guard = self.inner.write();
        guard.check(&writes)?;

        let Inner {
            nodes,
            records,
            journals,
        } = &mut *guard;
        let tx = writes.record.tx_id;
        let mut prior = Vec::with_capacity(writes.written.len());
        for node in &writes.written {
            let held = writes.creates.contains(node) || writes.deletes.contains(node);
            let before = nodes.insert(
                node.clone(),
                NodeState {
                    last_update: writes.timestamp.clone(),
                    held_by: held.then_some(tx),
                },
            );
            prior.push((node.clone(), before.map(|s| s.last_update)));
        }

        debug!(tx_id = %tx, nodes = prior.len(), "[cg-02] Persisted transaction record");
        journals.insert(
            tx,
            Journal {
                timestamp: writes.timestamp,
                prior,
                deletes: writes.deletes,
            },
        );
        records.insert(tx, writes.record);
        Ok(())
    }

    async fn commit_transaction(&self, tx: TxId) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut guard = self.inner.write();
        let Inner {
            nodes,
            records,
            journals,
        } = &mut *guard;
        records.remove(&tx);
        let Some(journal) = journals.remove(&tx) else {
            return Ok(());
        };

        for (node, _) in &journal.prior {
            let held = nodes.get(node).is_some_and(|s| s.held_by == Some(tx));
            if !held {
                continue;
            }
            if journal.deletes.contains(node) {
                nodes.remove(node);
            } else if let Some(state) = nodes.get_mut(node) {
                state.held_by = None;
            }
        }
        debug!(tx_id = %tx, removed = journal.deletes.len(), "[cg-02] Committed transaction writes");
        Ok(())
    }

    async fn rollback_transaction(&self, tx: TxId) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut guard = self.inner.write();
        let Inner {
            nodes,
            records,
            journals,
        } = &mut *guard;
        records.remove(&tx);
        let Some(journal) = journals.remove(&tx) else {
            return Ok(());
        };

        let mut restored = 0;
        for (node, before) in journal.prior {
            let ours = nodes.get(&node).is_some_and(|s| {
                s.held_by == Some(tx) || (s.held_by.is_none() && s.last_update == journal.timestamp)
            });
            if !ours {
                // A later writer has replaced our clock.
                continue;
            }
            restored += 1;
            match before {
                Some(last_update) => {
                    nodes.insert(
                        node,
                        NodeState {
                            last_update,
                            held_by: None,
                        },
                    );
                }
                None => {
                    nodes.remove(&node);
                }
            }
        }
        debug!(tx_id = %tx, restored, "[cg-02] Rolled back transaction writes");
        Ok(())
    }

    async fn pending_transactions(
        &self,
        coordinator: ReplicaId,
    ) -> Result<Vec<TxRecord>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(self
            .inner
            .read()
            .records
            .values()
            .filter(|r| r.coordinator == coordinator)
            .cloned()
            .collect())
    }
}
