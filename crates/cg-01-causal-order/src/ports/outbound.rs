//! Outbound Ports (Driven Ports / SPI)
//!
//! The temporal-order service imposes a total order on clocks the local
//! comparator cannot order. Once it has answered for a pair, later answers
//! for that pair never change.

use async_trait::async_trait;

use crate::domain::{OrderOutcome, OrderRequest, OrderServiceError};

/// External arbiter for locally incomparable clocks.
#[async_trait]
pub trait TemporalOrderService: Send + Sync {
    /// Answer one batch. The reply holds exactly one outcome per request,
    /// in request order. All requests share a single epoch.
    ///
    /// A hard pair (`soft_fail == false`) the service cannot order fails
    /// the whole batch. A soft pair may come back `Unresolved`.
    async fn order(&self, requests: Vec<OrderRequest>)
        -> Result<Vec<OrderOutcome>, OrderServiceError>;
}

/// Test doubles for the order service.
///
/// Public so downstream crates and the integration suite can script
/// service behavior.
pub mod mocks {
    use super::*;
    use crate::domain::OrderRelation;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Reply = Result<Vec<OrderOutcome>, OrderServiceError>;

    enum Step {
        Reply(Reply),
        Uniform(OrderRelation),
    }

    /// Replies from a queue; once drained, answers every pair as
    /// happens-before. Records each batch it receives.
    #[derive(Default)]
    pub struct ScriptedOrderService {
        script: Mutex<VecDeque<Step>>,
        batches: Mutex<Vec<Vec<OrderRequest>>>,
        calls: AtomicUsize,
    }

    impl ScriptedOrderService {
        /// Service that always answers happens-before.
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue one literal reply.
        pub fn push_reply(&self, reply: Reply) -> &Self {
            self.script.lock().push_back(Step::Reply(reply));
            self
        }

        /// Queue a reply that applies `relation` to every pair of the batch.
        pub fn push_uniform(&self, relation: OrderRelation) -> &Self {
            self.script.lock().push_back(Step::Uniform(relation));
            self
        }

        /// Number of batches received.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Copies of every batch received, in arrival order.
        pub fn batches(&self) -> Vec<Vec<OrderRequest>> {
            self.batches.lock().clone()
        }
    }

    #[async_trait]
    impl TemporalOrderService for ScriptedOrderService {
        async fn order(&self, requests: Vec<OrderRequest>) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = requests.len();
            self.batches.lock().push(requests);
            let step = self.script.lock().pop_front();
            match step {
                Some(Step::Reply(reply)) => reply,
                Some(Step::Uniform(rel)) => Ok(vec![OrderOutcome::Ordered(rel); n]),
                None => Ok(vec![OrderOutcome::Ordered(OrderRelation::HappensBefore); n]),
            }
        }
    }

    /// Sleeps for a fixed delay before answering happens-before.
    pub struct StalledOrderService {
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StalledOrderService {
        /// Service that answers only after `delay`.
        pub fn new(delay: Duration) -> Self {
            Self {
                delay,
                calls: AtomicUsize::new(0),
            }
        }

        /// Number of batches received.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TemporalOrderService for StalledOrderService {
        async fn order(&self, requests: Vec<OrderRequest>) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(vec![
                OrderOutcome::Ordered(OrderRelation::HappensBefore);
                requests.len()
            ])
        }
    }
}
