//! Domain layer for Transaction Admission
//!
//! Graph updates, pending transactions, the admission state machine, and
//! the replica timestamper.

pub mod entities;
pub mod errors;
pub mod timestamper;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use timestamper::Timestamper;
pub use value_objects::*;
