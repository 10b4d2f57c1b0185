//! # Core Domain Entities
//!
//! Identifiers for the actors and objects of the sharded graph store.
//!
//! ## Clusters
//!
//! - **Coordination**: `ReplicaId` (timestamper replicas), `TxId`
//! - **Partitioning**: `ShardId`, `ClusterLayout`
//! - **Graph**: `NodeHandle`, `EdgeHandle`

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::LayoutError;

/// Shard identifier. Shards are numbered densely from zero.
pub type ShardId = u16;

/// Identifier of a coordinating timestamper replica.
///
/// Replica `r` owns counter slot `r + 1` of every vector clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplicaId(pub u64);

impl ReplicaId {
    /// Index of this replica's counter inside a clock's slot vector.
    pub fn slot(&self) -> usize {
        self.0 as usize + 1
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vt{}", self.0)
    }
}

/// Identifier of a client-submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Handle naming a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(pub String);

impl NodeHandle {
    /// Create a handle from anything string-like.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle naming a graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeHandle(pub String);

impl EdgeHandle {
    /// Create a handle from anything string-like.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

impl fmt::Display for EdgeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide cluster shape shared by every participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLayout {
    /// Number of coordinating timestamper replicas.
    pub num_replicas: usize,
    /// Number of graph shards.
    pub num_shards: usize,
}

impl Default for ClusterLayout {
    fn default() -> Self {
        Self {
            num_replicas: 1,
            num_shards: 2,
        }
    }
}

impl ClusterLayout {
    /// Layout used by unit tests: three replicas, four shards.
    pub fn for_testing() -> Self {
        Self {
            num_replicas: 3,
            num_shards: 4,
        }
    }

    /// Number of u64 slots in every vector clock (epoch + one per replica).
    pub fn clock_len(&self) -> usize {
        self.num_replicas + 1
    }

    /// Whether `shard` exists in this layout.
    pub fn contains_shard(&self, shard: ShardId) -> bool {
        (shard as usize) < self.num_shards
    }

    /// Whether `replica` exists in this layout.
    pub fn contains_replica(&self, replica: ReplicaId) -> bool {
        (replica.0 as usize) < self.num_replicas
    }

    /// Reject degenerate layouts.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.num_replicas == 0 {
            return Err(LayoutError::NoReplicas);
        }
        if self.num_shards == 0 {
            return Err(LayoutError::NoShards);
        }
        if self.num_shards > ShardId::MAX as usize + 1 {
            return Err(LayoutError::TooManyShards(self.num_shards));
        }
        Ok(())
    }
}
