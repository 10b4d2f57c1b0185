//! Application layer for Transaction Admission

pub mod tracker;

pub use tracker::{AdmissionStats, AdmissionTracker};
