//! Adapters for Transaction Admission
//!
//! - `in_memory_store`: process-local graph store with failure injection

pub mod in_memory_store;

pub use in_memory_store::InMemoryGraphStore;
