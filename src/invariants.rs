//! Debug-only assertion macros for the invariants listed in spec §3.
//!
//! These are zero-cost in release builds (`debug_assert!` compiles out).
//! Ported from the shape of the teacher's `invariants.rs`, generalized from
//! one ring's sequence-counter invariants to all six queues' counters,
//! chunk pointers, and ref counts.

// =============================================================================
// I2 / I6: bounded, monotonic ring indices
// =============================================================================

/// `0 <= tail - head <= capacity`, and indices never move backwards.
macro_rules! debug_assert_ring_bounds {
    ($head:expr, $tail:expr, $capacity:expr) => {
        debug_assert!(
            $tail.wrapping_sub($head) as usize <= $capacity,
            "I2 violated: tail {} - head {} exceeds capacity {}",
            $tail,
            $head,
            $capacity
        )
    };
}

/// A sequence counter only increases.
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "I6 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// I1: flag/value visibility
// =============================================================================

/// A slot must be published (`flag == 1`) before its value is read.
macro_rules! debug_assert_flag_published {
    ($flag:expr) => {
        debug_assert!($flag, "I1 violated: reading a slot whose flag is not set")
    };
}

// =============================================================================
// I3 / I4: chain pointer validity
// =============================================================================

/// A chunk pointer obtained mid-protocol must not be null.
macro_rules! debug_assert_non_null_chunk {
    ($ptr:expr) => {
        debug_assert!(
            !$ptr.is_null(),
            "I3 violated: chunk pointer unexpectedly null"
        )
    };
}

// =============================================================================
// SPMC chain `ref` counter (spec §4.6)
// =============================================================================

/// `ref` never goes negative; it starts at `chunk_size` and is decremented
/// exactly once per successful pop of that chunk.
macro_rules! debug_assert_ref_non_negative {
    ($remaining:expr) => {
        debug_assert!(
            $remaining >= 0,
            "I5 violated: chunk ref counter went negative ({})",
            $remaining
        )
    };
}

pub(crate) use debug_assert_flag_published;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_non_null_chunk;
pub(crate) use debug_assert_ref_non_negative;
pub(crate) use debug_assert_ring_bounds;
