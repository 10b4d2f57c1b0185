//! # Shared Types Crate
//!
//! Types every subsystem of the graph store agrees on.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identifiers, vector clocks and the cluster
//!   layout are defined once, here.
//! - **Immutable Clocks**: a `VectorClock` is never updated in place. Every
//!   derivation (`incremented`, `merged`) returns a new clock.
//! - **Fixed Wire Width**: all participants share one clock length, carried
//!   by `ClusterLayout`.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod wire;

pub use clock::{Timestamp, VectorClock, EPOCH_SLOT};
pub use entities::*;
pub use errors::*;
pub use wire::{decode_clock, encode_clock, SLOT_WIDTH};
