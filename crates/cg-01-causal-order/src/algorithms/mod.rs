//! Algorithms module for Causal Order
//!
//! Contains:
//! - Pairwise vector clock comparison
//! - All-pairs non-minimal marking
//! - Local happens-before helpers

pub mod comparator;

pub use comparator::{
    compare_two_clocks, compare_vector_clocks, equal_or_happens_before_local,
    happens_before_all_local, happens_before_local, local_minimum,
};
