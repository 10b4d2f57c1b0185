//! # Domain Value Objects
//!
//! Comparison verdicts, order-service requests, and the non-minimal flag set
//! produced by an all-pairs scan.

use serde::{Deserialize, Serialize};
use shared_types::{ReplicaId, Timestamp, VectorClock};

/// Relationship between two vector clocks as seen by the local comparator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonResult {
    /// Left clock is causally earlier.
    LhsSmaller,
    /// Right clock is causally earlier.
    RhsSmaller,
    /// Neither clock dominates the other.
    Incomparable,
    /// Same epoch, same counters.
    Identical,
}

impl ComparisonResult {
    /// Verdict with the two sides swapped.
    pub fn reversed(self) -> Self {
        match self {
            Self::LhsSmaller => Self::RhsSmaller,
            Self::RhsSmaller => Self::LhsSmaller,
            other => other,
        }
    }

    /// True when the comparator decided a strict order.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::LhsSmaller | Self::RhsSmaller)
    }
}

/// Relation the temporal-order service imposes on a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderRelation {
    /// `lhs` happens before `rhs`.
    HappensBefore,
    /// `lhs` happens after `rhs`.
    HappensAfter,
}

impl OrderRelation {
    /// Relation with the two sides swapped.
    pub fn reversed(self) -> Self {
        match self {
            Self::HappensBefore => Self::HappensAfter,
            Self::HappensAfter => Self::HappensBefore,
        }
    }
}

/// One pair submitted to the temporal-order service.
///
/// All requests in a batch share one epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Left clock.
    pub lhs: VectorClock,
    /// Right clock.
    pub rhs: VectorClock,
    /// Replica that assigned `lhs`.
    pub lhs_replica: ReplicaId,
    /// Replica that assigned `rhs`.
    pub rhs_replica: ReplicaId,
    /// Relation the caller asks the service to establish.
    pub relation: OrderRelation,
    /// When set, a failure on this pair leaves only this pair unresolved
    /// instead of failing the whole batch.
    pub soft_fail: bool,
}

impl OrderRequest {
    /// Ask for `lhs` happens-before `rhs`.
    pub fn happens_before(lhs: &Timestamp, rhs: &Timestamp, soft_fail: bool) -> Self {
        Self {
            lhs: lhs.clock.clone(),
            rhs: rhs.clock.clone(),
            lhs_replica: lhs.replica,
            rhs_replica: rhs.replica,
            relation: OrderRelation::HappensBefore,
            soft_fail,
        }
    }

    /// Epoch shared by both sides (the lhs epoch).
    pub fn epoch(&self) -> u64 {
        self.lhs.epoch()
    }
}

/// Per-pair answer from the temporal-order service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderOutcome {
    /// The service imposed (or recalled) this relation for `lhs` vs `rhs`.
    Ordered(OrderRelation),
    /// Soft-fail pair the service could not settle this round.
    Unresolved,
}

impl OrderOutcome {
    /// The decided relation, if any.
    pub fn relation(&self) -> Option<OrderRelation> {
        match self {
            Self::Ordered(rel) => Some(*rel),
            Self::Unresolved => None,
        }
    }
}

/// Flag per clock: true iff some other clock in the set is provably earlier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonMinimalFlags {
    flags: Vec<bool>,
    marked: usize,
}

impl NonMinimalFlags {
    /// All clocks start as candidate minima.
    pub fn new(len: usize) -> Self {
        Self {
            flags: vec![false; len],
            marked: 0,
        }
    }

    /// Mark clock `idx` as not minimal. Returns true if it was newly marked.
    pub fn mark(&mut self, idx: usize) -> bool {
        match self.flags.get_mut(idx) {
            Some(flag) if !*flag => {
                *flag = true;
                self.marked += 1;
                true
            }
            _ => false,
        }
    }

    /// Whether clock `idx` is known not to be the minimum.
    pub fn is_marked(&self, idx: usize) -> bool {
        self.flags.get(idx).copied().unwrap_or(false)
    }

    /// Number of clocks in the set.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// True for an empty clock set.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Number of clocks marked non-minimal.
    pub fn marked(&self) -> usize {
        self.marked
    }

    /// Number of clocks still possibly minimal.
    pub fn remaining(&self) -> usize {
        self.flags.len() - self.marked
    }

    /// The index of the only unmarked clock, when exactly one remains.
    pub fn sole_candidate(&self) -> Option<usize> {
        if self.remaining() != 1 {
            return None;
        }
        self.flags.iter().position(|f| !*f)
    }

    /// All pairs `(i, j)`, `i < j`, where both clocks are still unmarked.
    pub fn unmarked_pairs(&self) -> Vec<(usize, usize)> {
        let open: Vec<usize> = (0..self.flags.len()).filter(|i| !self.flags[*i]).collect();
        let mut pairs = Vec::with_capacity(open.len() * open.len().saturating_sub(1) / 2);
        for (k, &i) in open.iter().enumerate() {
            for &j in &open[k + 1..] {
                pairs.push((i, j));
            }
        }
        pairs
    }

    /// Raw flags in clock order.
    pub fn as_slice(&self) -> &[bool] {
        &self.flags
    }
}
