//! Configuration for Causal Order Subsystem

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{CausalOrderError, DEFAULT_CACHE_CAPACITY, DEFAULT_ORDER_TIMEOUT_MS};

/// Oracle configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Bounded wait for one order-service round trip (milliseconds)
    pub order_timeout_ms: u64,
    /// Memoize happens-before facts learned from the order service
    pub enable_cache: bool,
    /// Maximum memoized facts
    pub cache_capacity: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            order_timeout_ms: DEFAULT_ORDER_TIMEOUT_MS,
            enable_cache: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl OracleConfig {
    /// Small cache and a generous timeout so slow CI hosts do not flake.
    pub fn for_testing() -> Self {
        Self {
            order_timeout_ms: 500,
            enable_cache: true,
            cache_capacity: 64,
        }
    }

    /// Bounded wait as a [`Duration`].
    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }

    /// Reject configurations the oracle cannot run with.
    pub fn validate(&self) -> Result<(), CausalOrderError> {
        if self.order_timeout_ms == 0 {
            return Err(CausalOrderError::InvalidConfig(
                "order_timeout_ms must be > 0".into(),
            ));
        }
        if self.enable_cache && self.cache_capacity == 0 {
            return Err(CausalOrderError::InvalidConfig(
                "cache_capacity must be > 0 when the cache is enabled".into(),
            ));
        }
        Ok(())
    }
}
