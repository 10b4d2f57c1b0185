//! # CG-01: Causal Order Subsystem
//!
//! Decides causal order between vector-clock timestamps assigned by
//! different coordinator replicas.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Compare vector clocks locally (epoch first, then per-replica counters)
//! - Escalate locally incomparable pairs to the temporal-order service in a
//!   single batched, time-bounded round trip
//! - Verify that a commit timestamp is ordered after everything it read
//!
//! ## Escalation Policy
//!
//! | Situation | External call |
//! |-----------|---------------|
//! | Local pass isolates a unique minimum | never |
//! | A `before` clock is provably not earlier | never (fail immediately) |
//! | Happens-before fact already memoized | never |
//! | Remaining incomparable pairs | exactly one batch |
//!
//! ## Module Structure
//!
//! ```text
//! cg-01-causal-order/
//! ├── domain/          # ComparisonResult, OrderRequest, errors, invariants
//! ├── algorithms/      # Pure comparator
//! ├── ports/           # CausalOrderApi + TemporalOrderService
//! ├── adapters/        # Happens-before cache, in-memory order service
//! └── application/     # Oracle
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{HappensBeforeCache, InMemoryTemporalOrderService};
pub use algorithms::{
    compare_two_clocks, compare_vector_clocks, equal_or_happens_before_local,
    happens_before_all_local, happens_before_local, local_minimum,
};
pub use application::{Oracle, OracleStats, OracleStatsSnapshot};
pub use config::OracleConfig;
pub use domain::{
    CausalOrderError, ComparisonResult, NonMinimalFlags, OrderOutcome, OrderRelation,
    OrderRequest, OrderServiceError, DEFAULT_CACHE_CAPACITY, DEFAULT_ORDER_TIMEOUT_MS,
};
pub use ports::{CausalOrderApi, TemporalOrderService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
