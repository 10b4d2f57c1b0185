//! # Domain Invariants
//!
//! Rules every comparison set and every escalation batch must satisfy.

use super::errors::CausalOrderError;
use super::value_objects::{NonMinimalFlags, OrderRequest};

/// Default bound on one order-service round trip.
pub const DEFAULT_ORDER_TIMEOUT_MS: u64 = 100;

/// Default number of memoized happens-before facts.
pub const DEFAULT_CACHE_CAPACITY: usize = 8192;

/// Invariant: all requests of one batch share a single epoch.
///
/// Returns the shared epoch, or `None` for an empty batch.
pub fn invariant_single_epoch(requests: &[OrderRequest]) -> Result<Option<u64>, CausalOrderError> {
    let mut epoch = None;
    for req in requests {
        for got in [req.lhs.epoch(), req.rhs.epoch()] {
            match epoch {
                None => epoch = Some(got),
                Some(expected) if expected != got => {
                    return Err(CausalOrderError::EpochMismatch { expected, got });
                }
                Some(_) => {}
            }
        }
    }
    Ok(epoch)
}

/// Invariant: the order service answers every pair it was asked about.
pub fn invariant_complete_response(asked: usize, answered: usize) -> Result<(), CausalOrderError> {
    if asked != answered {
        return Err(CausalOrderError::ProtocolViolation(format!(
            "asked {} pairs, got {} verdicts",
            asked, answered
        )));
    }
    Ok(())
}

/// Invariant: a settled tournament leaves exactly one candidate minimum.
pub fn invariant_unique_minimum(flags: &NonMinimalFlags) -> Result<usize, CausalOrderError> {
    match flags.sole_candidate() {
        Some(idx) => Ok(idx),
        None if flags.remaining() == 0 => Err(CausalOrderError::UnresolvedTournament),
        None => Err(CausalOrderError::ProtocolViolation(format!(
            "{} candidate minima after a complete response",
            flags.remaining()
        ))),
    }
}
