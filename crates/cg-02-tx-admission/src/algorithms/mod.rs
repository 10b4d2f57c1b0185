//! Algorithms module for Transaction Admission
//!
//! Contains:
//! - Update-list validation and dependency extraction

pub mod dependencies;

pub use dependencies::{collect_dependencies, Dependencies};
