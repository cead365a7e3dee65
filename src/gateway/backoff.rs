//! Reconnect backoff with jitter.
//!
//! On every transport closure the connection waits
//! `min(30s, 1s * 2^min(n, 6)) + jitter` before opening a fresh socket,
//! where `n` is the attempt number since the last successful
//! authentication and jitter is uniform in `[0, 1s)`. The total is
//! clamped to a hard ceiling of 60s. There is no retry limit; the loop
//! runs for the lifetime of the process.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rand::Rng;

// ============================================================================
// Constants
// ============================================================================

/// Base unit of the exponential schedule.
const BACKOFF_BASE_MS: u64 = 1_000;

/// Exponent cap: `2^6` seconds is the largest pre-clamp power.
const BACKOFF_MAX_EXPONENT: u32 = 6;

/// Cap on the exponential component before jitter.
const BACKOFF_CEILING_MS: u64 = 30_000;

/// Upper bound (exclusive) of the uniform jitter.
const JITTER_MS: u64 = 1_000;

/// Hard ceiling on the total delay.
const MAX_RECONNECT_DELAY_MS: u64 = 60_000;

// ============================================================================
// Delay Computation
// ============================================================================

/// Computes the reconnect delay for attempt `n` (1-based).
///
/// The randomized jitter decorrelates retry storms across many
/// connections that lost the same upstream at the same moment.
#[must_use]
pub fn reconnect_delay(attempt: u32, rng: &mut impl Rng) -> Duration {
    let exponent = attempt.min(BACKOFF_MAX_EXPONENT);
    let base = (BACKOFF_BASE_MS << exponent).min(BACKOFF_CEILING_MS);
    let jitter = rng.gen_range(0..JITTER_MS);
    Duration::from_millis((base + jitter).min(MAX_RECONNECT_DELAY_MS))
}

// ============================================================================
// Tests
// ============================================================================
