//! Adapters for Causal Order
//!
//! - `happens_before_cache`: memo of happens-before facts learned from the
//!   order service
//! - `in_memory_order_service`: deterministic in-process order service

pub mod happens_before_cache;
pub mod in_memory_order_service;

pub use happens_before_cache::HappensBeforeCache;
pub use in_memory_order_service::InMemoryTemporalOrderService;
