//! # In-Memory Temporal Order Service
//!
//! Deterministic, single-process order service. It keeps every relation it
//! has imposed and answers new pairs consistently with them and with
//! vector-clock dominance:
//!
//! - a remembered pair is answered as remembered
//! - if `rhs` already reaches `lhs` (through imposed edges or dominance) the
//!   answer is happens-after
//! - otherwise `lhs < rhs` is imposed and remembered
//!
//! Memory grows with the number of distinct pairs asked about.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::VectorClock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::algorithms::happens_before_local;
use crate::domain::{OrderOutcome, OrderRelation, OrderRequest, OrderServiceError};
use crate::ports::TemporalOrderService;

#[derive(Default)]
struct OrderGraph {
    /// earlier -> clocks imposed later than it
    successors: HashMap<VectorClock, HashSet<VectorClock>>,
}

impl OrderGraph {
    fn has_edge(&self, from: &VectorClock, to: &VectorClock) -> bool {
        self.successors
            .get(from)
            .map(|s| s.contains(to))
            .unwrap_or(false)
    }

    fn insert(&mut self, earlier: &VectorClock, later: &VectorClock) {
        self.successors
            .entry(earlier.clone())
            .or_default()
            .insert(later.clone());
    }

    fn known_clocks(&self) -> HashSet<&VectorClock> {
        let mut all = HashSet::new();
        for (from, tos) in &self.successors {
            all.insert(from);
            all.extend(tos.iter());
        }
        all
    }

    /// `from` is ordered before `to` through imposed edges and dominance.
    fn reaches(&self, from: &VectorClock, to: &VectorClock) -> bool {
        let precedes = |x: &VectorClock, y: &VectorClock| {
            self.has_edge(x, y) || happens_before_local(x, y).unwrap_or(false)
        };
        if precedes(from, to) {
            return true;
        }

        let known = self.known_clocks();
        let mut seen: HashSet<&VectorClock> = HashSet::new();
        let mut stack: Vec<&VectorClock> = vec![from];
        while let Some(cur) = stack.pop() {
            if !seen.insert(cur) {
                continue;
            }
            if precedes(cur, to) {
                return true;
            }
            for next in known.iter().copied() {
                if !seen.contains(next) && precedes(cur, next) {
                    stack.push(next);
                }
            }
        }
        false
    }
}

/// Order service that runs in-process and never forgets an answer.
#[derive(Default)]
pub struct InMemoryTemporalOrderService {
    graph: RwLock<OrderGraph>,
    // Serializes decisions so two concurrent batches cannot impose a cycle.
    decide: Mutex<()>,
    offline: AtomicBool,
    calls: AtomicU64,
}

impl InMemoryTemporalOrderService {
    /// Empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while offline every batch fails with
    /// [`OrderServiceError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of batches received.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of relations imposed so far.
    pub fn imposed(&self) -> usize {
        self.graph.read().successors.values().map(|s| s.len()).sum()
    }

    fn decide_pair(&self, lhs: &VectorClock, rhs: &VectorClock) -> OrderRelation {
        {
            let graph = self.graph.read();
            if graph.has_edge(lhs, rhs) {
                return OrderRelation::HappensBefore;
            }
            if graph.has_edge(rhs, lhs) {
                return OrderRelation::HappensAfter;
            }
            if graph.reaches(rhs, lhs) {
                drop(graph);
                self.graph.write().insert(rhs, lhs);
                return OrderRelation::HappensAfter;
            }
        }
        self.graph.write().insert(lhs, rhs);
        OrderRelation::HappensBefore
    }
}

#[async_trait]
impl TemporalOrderService for InMemoryTemporalOrderService {
    async fn order(
        &self,
        requests: Vec<OrderRequest>,
    ) -> Result<Vec<OrderOutcome>, OrderServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.offline.load(Ordering::SeqCst) {
            warn!("[cg-01] in-memory order service offline");
            return Err(OrderServiceError::Unavailable("offline".into()));
        }

        let Some(first) = requests.first().map(|r| r.epoch()) else {
            return Ok(Vec::new());
        };
        for req in &requests {
            for other in [req.lhs.epoch(), req.rhs.epoch()] {
                if other != first {
                    return Err(OrderServiceError::MixedEpochs { first, other });
                }
            }
            if req.lhs.len() != req.rhs.len() {
                return Err(OrderServiceError::Rejected(format!(
                    "clock lengths differ: {} vs {}",
                    req.lhs.len(),
                    req.rhs.len()
                )));
            }
        }

        let _guard = self.decide.lock();
        let outcomes: Vec<OrderOutcome> = requests
            .iter()
            .map(|req| OrderOutcome::Ordered(self.decide_pair(&req.lhs, &req.rhs)))
            .collect();

        debug!(
            epoch = first,
            pairs = outcomes.len(),
            "[cg-01] in-memory order service answered batch"
        );
        Ok(outcomes)
    }
}
