//! The `num` / `park` protocol shared by all six queues (spec §3, §5).
//!
//! `num` is the canonical pending-item count; a negative value means one or
//! more consumers are parked. This module centralizes the two comparisons
//! every queue performs around it, rather than duplicating them per queue
//! the way `original_source/container/queue/{spsc,mpsc,spmc}.go` does
//! (Go's `inst.num.Add(1) < 1` / `inst.num.Add(-1) < 0`, inlined in every
//! file) — the comparisons are identical in all six queues, so factoring
//! them out removes six copies of the same off-by-one trap.

use std::sync::atomic::{AtomicI64, Ordering};

/// Called after a producer publishes a value and increments `num`.
/// Returns `true` if a consumer may be parked and should be notified.
#[inline]
pub(crate) fn on_push(num: &AtomicI64) -> bool {
    let prev = num.fetch_add(1, Ordering::AcqRel);
    prev < 0
}

/// Called before a consumer reads a value and decrements `num`.
/// Returns `true` if the consumer must block on `park` before proceeding.
#[inline]
pub(crate) fn on_pop_must_park(num: &AtomicI64) -> bool {
    let prev = num.fetch_sub(1, Ordering::AcqRel);
    prev < 1
}

/// `len()` clamps the internal, possibly-negative counter to zero
/// (spec §6).
#[inline]
pub(crate) fn len(num: &AtomicI64) -> i64 {
    num.load(Ordering::Relaxed).max(0)
}
