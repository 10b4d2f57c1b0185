//! # Vector Clock Comparator
//!
//! Pure, local comparison of vector clocks. Nothing here talks to the
//! temporal-order service.
//!
//! ## Algorithm
//!
//! 1. Compare epochs. A lower epoch is earlier regardless of counters.
//! 2. Same epoch: scan counters, tracking whether `a` is below `b` anywhere
//!    and whether `b` is below `a` anywhere. Both → incomparable.

use shared_types::VectorClock;

use crate::domain::{CausalOrderError, ComparisonResult, NonMinimalFlags};

/// Classify the causal relationship between two clocks.
///
/// Clocks from different epochs are ordered by epoch alone, so they may
/// differ in length. Same-epoch clocks of different lengths are rejected.
pub fn compare_two_clocks(
    a: &VectorClock,
    b: &VectorClock,
) -> Result<ComparisonResult, CausalOrderError> {
    if a.epoch() < b.epoch() {
        return Ok(ComparisonResult::LhsSmaller);
    }
    if a.epoch() > b.epoch() {
        return Ok(ComparisonResult::RhsSmaller);
    }
    if a.len() != b.len() {
        return Err(CausalOrderError::ClockLengthMismatch {
            lhs: a.len(),
            rhs: b.len(),
        });
    }

    let mut a_below = false;
    let mut b_below = false;
    for (x, y) in a.counters().iter().zip(b.counters()) {
        if x < y {
            a_below = true;
        } else if x > y {
            b_below = true;
        }
        if a_below && b_below {
            return Ok(ComparisonResult::Incomparable);
        }
    }

    Ok(match (a_below, b_below) {
        (true, false) => ComparisonResult::LhsSmaller,
        (false, true) => ComparisonResult::RhsSmaller,
        _ => ComparisonResult::Identical,
    })
}

/// Mark every clock that is provably not the causal minimum of the set.
///
/// All-pairs scan with early exit once only one candidate can remain.
/// Two identical clocks in the set are an internal-consistency error.
pub fn compare_vector_clocks<C: AsRef<VectorClock>>(
    clocks: &[C],
) -> Result<NonMinimalFlags, CausalOrderError> {
    if clocks.is_empty() {
        return Err(CausalOrderError::EmptyClockSet);
    }

    let n = clocks.len();
    let mut flags = NonMinimalFlags::new(n);

    for i in 0..n - 1 {
        for j in i + 1..n {
            match compare_two_clocks(clocks[i].as_ref(), clocks[j].as_ref())? {
                ComparisonResult::LhsSmaller => {
                    flags.mark(j);
                }
                ComparisonResult::RhsSmaller => {
                    flags.mark(i);
                }
                ComparisonResult::Incomparable => {}
                ComparisonResult::Identical => {
                    return Err(CausalOrderError::DuplicateClock {
                        first: i,
                        second: j,
                    });
                }
            }
        }
        if flags.marked() == n - 1 {
            break;
        }
    }

    Ok(flags)
}

/// Index of the causal minimum if local comparison alone isolates it.
pub fn local_minimum<C: AsRef<VectorClock>>(
    clocks: &[C],
) -> Result<Option<usize>, CausalOrderError> {
    Ok(compare_vector_clocks(clocks)?.sole_candidate())
}

/// `a` provably happens before `b`.
pub fn happens_before_local(a: &VectorClock, b: &VectorClock) -> Result<bool, CausalOrderError> {
    Ok(compare_two_clocks(a, b)? == ComparisonResult::LhsSmaller)
}

/// `a` provably happens before every clock in `others`.
pub fn happens_before_all_local<C: AsRef<VectorClock>>(
    a: &VectorClock,
    others: &[C],
) -> Result<bool, CausalOrderError> {
    for other in others {
        if !happens_before_local(a, other.as_ref())? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// `a` is identical to `b` or provably happens before it.
pub fn equal_or_happens_before_local(
    a: &VectorClock,
    b: &VectorClock,
) -> Result<bool, CausalOrderError> {
    Ok(matches!(
        compare_two_clocks(a, b)?,
        ComparisonResult::LhsSmaller | ComparisonResult::Identical
    ))
}
