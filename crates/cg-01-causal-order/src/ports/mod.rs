//! Ports module for Causal Order
//!
//! Defines inbound (API) and outbound (SPI) port traits.

pub mod inbound;
pub mod outbound;

pub use inbound::CausalOrderApi;
pub use outbound::TemporalOrderService;
