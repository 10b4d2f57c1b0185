//! Cross-subsystem integration flows.

pub mod admission_flows;
pub mod oracle_flows;
