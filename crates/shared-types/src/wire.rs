//! # Vector Clock Wire Format
//!
//! A clock travels as `N` consecutive 8-byte little-endian unsigned integers:
//! slot 0 = epoch, slots 1..N = per-replica counters. `N` is the process-wide
//! `ClusterLayout::clock_len()`, so a buffer of any other size is rejected
//! rather than truncated or padded.

use crate::clock::VectorClock;
use crate::errors::ClockCodecError;

/// Bytes per clock slot.
pub const SLOT_WIDTH: usize = 8;

/// Encode a clock into its fixed-width wire form.
pub fn encode_clock(clock: &VectorClock) -> Vec<u8> {
    let mut buf = Vec::with_capacity(clock.len() * SLOT_WIDTH);
    for slot in clock.as_slots() {
        buf.extend_from_slice(&slot.to_le_bytes());
    }
    buf
}

/// Decode a clock of exactly `clock_len` slots.
pub fn decode_clock(bytes: &[u8], clock_len: usize) -> Result<VectorClock, ClockCodecError> {
    if clock_len == 0 {
        return Err(ClockCodecError::ZeroSlots);
    }
    let expected = clock_len * SLOT_WIDTH;
    if bytes.len() != expected {
        return Err(ClockCodecError::WrongLength {
            expected,
            got: bytes.len(),
        });
    }

    let slots = bytes
        .chunks_exact(SLOT_WIDTH)
        .map(|chunk| {
            let mut word = [0u8; SLOT_WIDTH];
            word.copy_from_slice(chunk);
            u64::from_le_bytes(word)
        })
        .collect();

    VectorClock::from_slots(slots).map_err(|_| ClockCodecError::ZeroSlots)
}
