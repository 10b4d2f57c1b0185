//! # Domain Value Objects
//!
//! Graph updates, the touched-shard bit set, and the admission state machine.

use serde::{Deserialize, Serialize};
use shared_types::{EdgeHandle, NodeHandle, ShardId};

/// A node together with the shard that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node handle.
    pub handle: NodeHandle,
    /// Owning shard.
    pub shard: ShardId,
}

impl NodeRef {
    /// Create a node reference.
    pub fn new(handle: impl Into<String>, shard: ShardId) -> Self {
        Self {
            handle: NodeHandle::new(handle),
            shard,
        }
    }
}

/// One write inside a transaction. Each variant carries only its own fields.
///
/// Edges live on the shard of their source node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphUpdate {
    /// Create a node on `shard`.
    CreateNode {
        /// New node handle.
        handle: NodeHandle,
        /// Shard that will own the node.
        shard: ShardId,
    },
    /// Create an edge stored at `from`.
    CreateEdge {
        /// New edge handle.
        handle: EdgeHandle,
        /// Source node (owns the edge).
        from: NodeRef,
        /// Destination node.
        to: NodeRef,
    },
    /// Delete a node.
    DeleteNode {
        /// Node to delete.
        node: NodeRef,
    },
    /// Set a node property.
    SetNodeProperty {
        /// Target node.
        node: NodeRef,
        /// Property key.
        key: String,
        /// Property value.
        value: String,
    },
    /// Delete an edge stored at `node`.
    DeleteEdge {
        /// Edge to delete.
        handle: EdgeHandle,
        /// Node owning the edge.
        node: NodeRef,
    },
    /// Set an edge property.
    SetEdgeProperty {
        /// Target edge.
        handle: EdgeHandle,
        /// Node owning the edge.
        node: NodeRef,
        /// Property key.
        key: String,
        /// Property value.
        value: String,
    },
    /// Give a node an additional name.
    AddAlias {
        /// The alias.
        alias: String,
        /// Aliased node.
        node: NodeRef,
    },
}

impl GraphUpdate {
    /// Shard that must apply (and acknowledge) this update.
    pub fn shard(&self) -> ShardId {
        match self {
            Self::CreateNode { shard, .. } => *shard,
            Self::CreateEdge { from, .. } => from.shard,
            Self::DeleteNode { node }
            | Self::SetNodeProperty { node, .. }
            | Self::DeleteEdge { node, .. }
            | Self::SetEdgeProperty { node, .. }
            | Self::AddAlias { node, .. } => node.shard,
        }
    }

    /// Every shard id the update mentions, including a remote edge target.
    pub fn mentioned_shards(&self) -> Vec<ShardId> {
        match self {
            Self::CreateEdge { from, to, .. } => vec![from.shard, to.shard],
            other => vec![other.shard()],
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateNode { .. } => "create_node",
            Self::CreateEdge { .. } => "create_edge",
            Self::DeleteNode { .. } => "delete_node",
            Self::SetNodeProperty { .. } => "set_node_property",
            Self::DeleteEdge { .. } => "delete_edge",
            Self::SetEdgeProperty { .. } => "set_edge_property",
            Self::AddAlias { .. } => "add_alias",
        }
    }
}

/// Fixed-size bit set indexed by shard id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardBits {
    words: Vec<u64>,
}

impl ShardBits {
    /// Empty set able to hold shards `0..num_shards`.
    pub fn new(num_shards: usize) -> Self {
        Self {
            words: vec![0; num_shards.div_ceil(64)],
        }
    }

    /// Capacity in shards.
    pub fn capacity(&self) -> usize {
        self.words.len() * 64
    }

    /// Set the bit for `shard`. Returns true if it was newly set,
    /// false if already set or out of range.
    pub fn insert(&mut self, shard: ShardId) -> bool {
        let (word, bit) = Self::locate(shard);
        match self.words.get_mut(word) {
            Some(w) if *w & bit == 0 => {
                *w |= bit;
                true
            }
            _ => false,
        }
    }

    /// Whether `shard` is set.
    pub fn contains(&self, shard: ShardId) -> bool {
        let (word, bit) = Self::locate(shard);
        self.words.get(word).map(|w| w & bit != 0).unwrap_or(false)
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no bit is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Set shard ids in ascending order.
    pub fn shards(&self) -> Vec<ShardId> {
        let mut out = Vec::with_capacity(self.count());
        for (i, w) in self.words.iter().enumerate() {
            let mut bits = *w;
            while bits != 0 {
                let tz = bits.trailing_zeros() as usize;
                out.push((i * 64 + tz) as ShardId);
                bits &= bits - 1;
            }
        }
        out
    }

    /// Shards in `self` but not in `other`.
    pub fn difference(&self, other: &ShardBits) -> Vec<ShardId> {
        self.shards()
            .into_iter()
            .filter(|s| !other.contains(*s))
            .collect()
    }

    fn locate(shard: ShardId) -> (usize, u64) {
        let idx = shard as usize;
        (idx / 64, 1u64 << (idx % 64))
    }
}

/// Admission state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AdmissionStatus {
    /// Shard acknowledgements pending.
    #[default]
    Open,
    /// Every touched shard acknowledged.
    Committed,
    /// Caller must resubmit with a strictly later timestamp.
    Retry,
    /// Transaction must be treated as never having happened.
    Aborted,
}

impl AdmissionStatus {
    /// Check if transition to next state is valid.
    pub fn can_transition_to(&self, next: AdmissionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Committed) | (Self::Open, Self::Retry) | (Self::Open, Self::Aborted)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

/// Reason for transaction abort.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// The store failed while reading dependencies or persisting.
    StoreFailure(String),
    /// A node the transaction reads does not exist.
    NodeNotFound(NodeHandle),
    /// A node the transaction creates already exists.
    NodeExists(NodeHandle),
    /// A shard reported that it could not apply its updates.
    ShardFailure {
        /// Which shard failed
        shard: ShardId,
        /// Reason for failure
        reason: String,
    },
    /// Acknowledgements did not all arrive in time.
    Timeout,
    /// Explicit abort by coordinator.
    CoordinatorAbort(String),
}

/// Result of recording one shard acknowledgement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AckProgress {
    /// More acknowledgements are needed.
    Waiting {
        /// Shards still to acknowledge.
        remaining: usize,
    },
    /// This was the last one; the transaction is committed.
    Committed,
}
