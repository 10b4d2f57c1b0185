//! Causal Order Oracle
//!
//! Main service implementing [`CausalOrderApi`].
//!
//! The oracle holds no per-transaction state. It owns a handle to the
//! temporal-order service, an optional happens-before memo, and counters.

use async_trait::async_trait;
use shared_types::{Timestamp, VectorClock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::adapters::HappensBeforeCache;
use crate::algorithms::{compare_two_clocks, compare_vector_clocks};
use crate::config::OracleConfig;
use crate::domain::{
    invariant_complete_response, invariant_single_epoch, invariant_unique_minimum,
    CausalOrderError, ComparisonResult, NonMinimalFlags, OrderOutcome, OrderRelation,
    OrderRequest,
};
use crate::ports::{CausalOrderApi, TemporalOrderService};

/// Oracle counters
#[derive(Debug, Default)]
pub struct OracleStats {
    /// Calls settled without the order service
    pub local_resolutions: AtomicU64,
    /// Batches sent to the order service
    pub service_calls: AtomicU64,
    /// Pairs sent to the order service
    pub pairs_escalated: AtomicU64,
    /// Pairs answered from the memo
    pub cache_hits: AtomicU64,
    /// Batches that failed or timed out
    pub service_failures: AtomicU64,
}

/// Point-in-time copy of [`OracleStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OracleStatsSnapshot {
    /// Calls settled without the order service
    pub local_resolutions: u64,
    /// Batches sent to the order service
    pub service_calls: u64,
    /// Pairs sent to the order service
    pub pairs_escalated: u64,
    /// Pairs answered from the memo
    pub cache_hits: u64,
    /// Batches that failed or timed out
    pub service_failures: u64,
}

impl OracleStats {
    /// Copy the current counter values.
    pub fn snapshot(&self) -> OracleStatsSnapshot {
        OracleStatsSnapshot {
            local_resolutions: self.local_resolutions.load(Ordering::Relaxed),
            service_calls: self.service_calls.load(Ordering::Relaxed),
            pairs_escalated: self.pairs_escalated.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            service_failures: self.service_failures.load(Ordering::Relaxed),
        }
    }
}

/// Causal order oracle
///
/// Pipeline for every operation:
/// 1. Compare locally
/// 2. Consult the happens-before memo (if enabled)
/// 3. Escalate what is left in one bounded round trip
pub struct Oracle<S: TemporalOrderService> {
    service: Arc<S>,
    config: OracleConfig,
    cache: Option<HappensBeforeCache>,
    stats: OracleStats,
}

impl<S: TemporalOrderService> Oracle<S> {
    /// Create an oracle with default config
    pub fn new(service: Arc<S>) -> Self {
        Self::build(service, OracleConfig::default())
    }

    /// Create an oracle with custom config
    pub fn with_config(service: Arc<S>, config: OracleConfig) -> Result<Self, CausalOrderError> {
        config.validate()?;
        Ok(Self::build(service, config))
    }

    fn build(service: Arc<S>, config: OracleConfig) -> Self {
        let cache = config
            .enable_cache
            .then(|| HappensBeforeCache::new(config.cache_capacity));
        Self {
            service,
            config,
            cache,
            stats: OracleStats::default(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// The happens-before memo, when enabled.
    pub fn cache(&self) -> Option<&HappensBeforeCache> {
        self.cache.as_ref()
    }

    /// The order service handle.
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Counter snapshot.
    pub fn stats(&self) -> OracleStatsSnapshot {
        self.stats.snapshot()
    }

    fn cached(&self, a: &VectorClock, b: &VectorClock) -> Option<OrderRelation> {
        let rel = self.cache.as_ref()?.lookup(a, b)?;
        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        Some(rel)
    }

    fn remember(&self, earlier: &VectorClock, later: &VectorClock) {
        if let Some(cache) = &self.cache {
            cache.record(earlier, later);
        }
    }

    /// One bounded round trip. Timeout and service errors both map to
    /// [`CausalOrderError::ServiceUnavailable`].
    async fn escalate(
        &self,
        requests: Vec<OrderRequest>,
    ) -> Result<Vec<OrderOutcome>, CausalOrderError> {
        let pairs = requests.len();
        self.stats.service_calls.fetch_add(1, Ordering::Relaxed);
        self.stats
            .pairs_escalated
            .fetch_add(pairs as u64, Ordering::Relaxed);

        debug!(pairs, "[cg-01] Escalating pairs to order service");

        match tokio::time::timeout(self.config.order_timeout(), self.service.order(requests)).await
        {
            Ok(Ok(outcomes)) => Ok(outcomes),
            Ok(Err(e)) => {
                self.stats.service_failures.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, pairs, "[cg-01] Order service failed");
                Err(CausalOrderError::ServiceUnavailable(e.to_string()))
            }
            Err(_) => {
                self.stats.service_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    timeout_ms = self.config.order_timeout_ms,
                    pairs, "[cg-01] Order service timed out"
                );
                Err(CausalOrderError::ServiceUnavailable(format!(
                    "timed out after {}ms",
                    self.config.order_timeout_ms
                )))
            }
        }
    }

    /// Apply a relation between clocks `i` and `j` the way a local
    /// comparison would: mark the later one.
    fn apply(
        &self,
        flags: &mut NonMinimalFlags,
        timestamps: &[Timestamp],
        (i, j): (usize, usize),
        rel: OrderRelation,
    ) {
        match rel {
            OrderRelation::HappensBefore => {
                flags.mark(j);
                self.remember(&timestamps[i].clock, &timestamps[j].clock);
            }
            OrderRelation::HappensAfter => {
                flags.mark(i);
                self.remember(&timestamps[j].clock, &timestamps[i].clock);
            }
        }
    }
}

#[async_trait]
impl<S: TemporalOrderService> CausalOrderApi for Oracle<S> {
    async fn compare_vts(&self, timestamps: &[Timestamp]) -> Result<usize, CausalOrderError> {
        // 1. Local pass
        let mut flags = compare_vector_clocks(timestamps)?;
        if let Some(idx) = flags.sole_candidate() {
            self.stats.local_resolutions.fetch_add(1, Ordering::Relaxed);
            return Ok(idx);
        }

        // 2. Memo pass
        if self.cache.is_some() {
            for pair in flags.unmarked_pairs() {
                if let Some(rel) = self.cached(&timestamps[pair.0].clock, &timestamps[pair.1].clock)
                {
                    self.apply(&mut flags, timestamps, pair, rel);
                }
            }
            if let Some(idx) = flags.sole_candidate() {
                self.stats.local_resolutions.fetch_add(1, Ordering::Relaxed);
                return Ok(idx);
            }
            if flags.remaining() == 0 {
                return Err(CausalOrderError::UnresolvedTournament);
            }
        }

        // 3. One soft-fail batch over the pairs still open
        let pairs = flags.unmarked_pairs();
        let requests: Vec<OrderRequest> = pairs
            .iter()
            .map(|&(i, j)| OrderRequest::happens_before(&timestamps[i], &timestamps[j], true))
            .collect();
        invariant_single_epoch(&requests)?;

        let outcomes = self.escalate(requests).await?;
        invariant_complete_response(pairs.len(), outcomes.len())
            .inspect_err(|e| error!(error = %e, "[cg-01] Order service broke protocol"))?;

        // 4. Apply every verdict against the pair snapshot
        let mut unresolved = 0;
        for (&pair, outcome) in pairs.iter().zip(outcomes.iter()) {
            match outcome.relation() {
                Some(rel) => self.apply(&mut flags, timestamps, pair, rel),
                None => unresolved += 1,
            }
        }

        // Resolved verdicts stay applied; the minimum waits for every pair.
        if unresolved > 0 {
            debug!(unresolved, "[cg-01] Soft-fail pairs left open");
            return Err(CausalOrderError::OrderUnresolved { pairs: unresolved });
        }
        invariant_unique_minimum(&flags)
            .inspect_err(|e| error!(error = %e, "[cg-01] Tournament left no unique minimum"))
    }

    async fn compare_two_vts(
        &self,
        a: &Timestamp,
        b: &Timestamp,
    ) -> Result<ComparisonResult, CausalOrderError> {
        match compare_two_clocks(&a.clock, &b.clock)? {
            ComparisonResult::Incomparable => {
                let pair = [a.clone(), b.clone()];
                Ok(match self.compare_vts(&pair).await? {
                    0 => ComparisonResult::LhsSmaller,
                    _ => ComparisonResult::RhsSmaller,
                })
            }
            local => Ok(local),
        }
    }

    async fn assign_vt_order(
        &self,
        before: &[Timestamp],
        after: &Timestamp,
    ) -> Result<bool, CausalOrderError> {
        // 1. Local pass; any provable violation fails without a call
        let mut ambiguous = Vec::new();
        for (idx, earlier) in before.iter().enumerate() {
            match compare_two_clocks(&earlier.clock, &after.clock)? {
                ComparisonResult::LhsSmaller => {}
                ComparisonResult::Incomparable => ambiguous.push(idx),
                ComparisonResult::RhsSmaller | ComparisonResult::Identical => {
                    self.stats.local_resolutions.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        index = idx,
                        before = %earlier,
                        after = %after,
                        "[cg-01] Ordering conflict, caller must retry"
                    );
                    return Ok(false);
                }
            }
        }

        // 2. Memo pass
        let mut open = Vec::with_capacity(ambiguous.len());
        for idx in ambiguous {
            match self.cached(&before[idx].clock, &after.clock) {
                Some(OrderRelation::HappensBefore) => {}
                Some(OrderRelation::HappensAfter) => return Ok(false),
                None => open.push(idx),
            }
        }
        if open.is_empty() {
            self.stats.local_resolutions.fetch_add(1, Ordering::Relaxed);
            return Ok(true);
        }

        // 3. One hard batch; anything short of all happens-before fails closed
        let requests: Vec<OrderRequest> = open
            .iter()
            .map(|&idx| OrderRequest::happens_before(&before[idx], after, false))
            .collect();
        invariant_single_epoch(&requests)?;

        let outcomes = match self.escalate(requests).await {
            Ok(outcomes) => outcomes,
            Err(_) => return Ok(false),
        };
        if outcomes.len() != open.len() {
            warn!(
                asked = open.len(),
                answered = outcomes.len(),
                "[cg-01] Malformed order response, failing closed"
            );
            return Ok(false);
        }
        if !outcomes
            .iter()
            .all(|o| *o == OrderOutcome::Ordered(OrderRelation::HappensBefore))
        {
            return Ok(false);
        }

        for idx in open {
            self.remember(&before[idx].clock, &after.clock);
        }
        Ok(true)
    }

    async fn clock_creat_before_del_after(
        &self,
        req: &Timestamp,
        creat: &Timestamp,
        del: Option<&Timestamp>,
    ) -> Result<bool, CausalOrderError> {
        if let Some(del) = del {
            match self.compare_two_vts(req, del).await? {
                ComparisonResult::LhsSmaller => {}
                ComparisonResult::RhsSmaller => return Ok(false),
                ComparisonResult::Identical => {
                    return Err(CausalOrderError::DuplicateClock {
                        first: 0,
                        second: 1,
                    })
                }
                ComparisonResult::Incomparable => {
                    return Err(CausalOrderError::ProtocolViolation(
                        "request and deletion clocks left unordered".into(),
                    ))
                }
            }
        }

        match self.compare_two_vts(creat, req).await? {
            ComparisonResult::LhsSmaller => Ok(true),
            ComparisonResult::RhsSmaller => Ok(false),
            ComparisonResult::Identical => Err(CausalOrderError::DuplicateClock {
                first: 0,
                second: 1,
            }),
            ComparisonResult::Incomparable => Err(CausalOrderError::ProtocolViolation(
                "creation and request clocks left unordered".into(),
            )),
        }
    }
}
