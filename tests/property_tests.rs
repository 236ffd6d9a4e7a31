//! Property-based tests for the invariants in spec §8 that hold under
//! purely sequential (single-thread) push/pop interleavings. The
//! concurrent, cardinality-specific properties (7-9) and the concrete
//! multi-thread scenarios (S1-S6) live in `tests/scenarios.rs` and the
//! per-module `#[cfg(test)]` blocks instead, since proptest's shrinking
//! model doesn't fit threaded interleavings well.

use proptest::prelude::*;
use ringfamily::{mpsc, pow2, spmc, spsc};

// =============================================================================
// Property 1 & 2: count conservation, no loss / no duplication
// =============================================================================

proptest! {
    #[test]
    fn spsc_ring_count_conservation(values in prop::collection::vec(any::<u32>(), 0..200)) {
        let ring = spsc::Ring::<u32>::new(8).unwrap();
        let mut received = Vec::with_capacity(values.len());
        for &v in &values {
            ring.push_tail(v);
            received.push(ring.pop_head());
        }
        prop_assert_eq!(received, values);
        prop_assert_eq!(ring.len(), 0);
    }

    #[test]
    fn spsc_chain_count_conservation(values in prop::collection::vec(any::<u32>(), 0..200)) {
        let chain = spsc::Chain::<u32>::new(3).unwrap();
        let mut received = Vec::with_capacity(values.len());
        for &v in &values {
            chain.push_tail(v);
            received.push(chain.pop_head());
        }
        prop_assert_eq!(received, values);
        prop_assert_eq!(chain.len(), 0);
    }

    #[test]
    fn mpsc_ring_count_conservation(values in prop::collection::vec(any::<u32>(), 0..200)) {
        let ring = mpsc::Ring::<u32>::new(8).unwrap();
        let mut received = Vec::with_capacity(values.len());
        for &v in &values {
            ring.push_tail(v);
            received.push(ring.pop_head());
        }
        prop_assert_eq!(received, values);
        prop_assert_eq!(ring.len(), 0);
    }

    #[test]
    fn spmc_ring_count_conservation(values in prop::collection::vec(any::<u32>(), 0..200)) {
        let ring = spmc::Ring::<u32>::new(8).unwrap();
        let mut received = Vec::with_capacity(values.len());
        for &v in &values {
            ring.push_tail(v);
            received.push(ring.pop_head());
        }
        prop_assert_eq!(received, values);
        prop_assert_eq!(ring.len(), 0);
    }
}

// =============================================================================
// Property 6: monotonic len() transitions — pushes grow it by exactly one,
// pops shrink it by exactly one.
// =============================================================================

proptest! {
    #[test]
    fn len_transitions_match_operations(ops in prop::collection::vec(prop::bool::ANY, 1..100)) {
        let ring = spsc::Ring::<u32>::new(64).unwrap();
        let mut model_len: i64 = 0;
        for push in ops {
            if push {
                ring.push_tail(0);
                model_len += 1;
            } else if model_len > 0 {
                ring.pop_head();
                model_len -= 1;
            } else {
                continue;
            }
            prop_assert_eq!(ring.len(), model_len);
        }
    }
}

// =============================================================================
// Property 5: capacity normalization
// =============================================================================

proptest! {
    #[test]
    fn ring_capacity_normalizes_to_power_of_two(n in 1i64..10_000) {
        let ring = spsc::Ring::<u8>::new(n).unwrap();
        let capacity = ring.capacity() as u64;
        prop_assert!(pow2::is_power_of_two(capacity));
        prop_assert!(capacity >= n as u64);
        prop_assert_eq!(capacity, pow2::ceil_to_power_of_two(n as u64));
    }
}
