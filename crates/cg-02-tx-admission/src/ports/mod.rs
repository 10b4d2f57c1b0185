//! Ports module for Transaction Admission
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::TransactionAdmissionApi;
pub use outbound::GraphStore;
