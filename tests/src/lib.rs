//! # Causal-Graph Test Suite
//!
//! Unified test crate for flows that cross subsystem boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── oracle_flows.rs      # Oracle + in-memory order service
//! │   └── admission_flows.rs   # Coordinators, shared store, shared oracle
//! └── benches/
//!     └── ordering_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p cg-tests
//!
//! # By category
//! cargo test -p cg-tests integration::oracle_flows
//! cargo test -p cg-tests integration::admission_flows
//!
//! # Benchmarks
//! cargo bench -p cg-tests
//! ```

pub mod integration;
