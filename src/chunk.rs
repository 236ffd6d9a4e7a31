//! The chunk and slot types shared by the MPSC and SPMC chain queues.
//!
//! Grounded in `original_source/container/queue/common.go`'s `chunk64`,
//! which both the Go MPSC and SPMC chains reuse as-is: MPSC never touches
//! `head_idx`/`ref_count` (it drains with a private local cursor instead,
//! since it has only one consumer), and SPMC never touches the producer's
//! local overflow bookkeeping beyond `tail_idx`. One generic type, two
//! partial users — matching the original rather than splitting into two
//! near-identical structs.
//!
//! `spsc::Chain` does not use this type; with exactly one producer and one
//! consumer it needs neither a per-slot flag nor atomic cursors, so it
//! keeps its own lighter chunk (see `spsc::chain`).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicI64, AtomicPtr, AtomicU8, AtomicUsize, Ordering};

use crate::padding::CachePadded;

/// One cell of a chunk: a value plus the publish marker described in
/// invariant I1.
pub(crate) struct Slot<T> {
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
    pub(crate) flag: AtomicU8,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            flag: AtomicU8::new(0),
        }
    }
}

// Safety: access to `value` is serialized by `flag`'s acquire/release pair
// (and, for MPSC, additionally by the per-slot `tail_idx` fetch_add that
// hands out each index to exactly one producer).
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

pub(crate) struct Chunk<T> {
    pub(crate) slots: Box<[Slot<T>]>,
    pub(crate) next: AtomicPtr<Chunk<T>>,
    /// MPSC: producers race for an index via `fetch_add`, one of whom
    /// installs the successor on overflow.
    pub(crate) tail_idx: CachePadded<AtomicUsize>,
    /// SPMC: consumers race for an index via `fetch_add`. Unused by MPSC.
    pub(crate) head_idx: CachePadded<AtomicUsize>,
    /// SPMC only: decrements to zero as consumers finish with this chunk's
    /// slots; the consumer that brings it to zero performs the rotation.
    /// Unused by MPSC.
    pub(crate) ref_count: AtomicI64,
}

impl<T> Chunk<T> {
    pub(crate) fn new(chunk_size: usize) -> Box<Self> {
        let slots = (0..chunk_size).map(|_| Slot::empty()).collect::<Vec<_>>();
        Box::new(Self {
            slots: slots.into_boxed_slice(),
            next: AtomicPtr::new(ptr::null_mut()),
            tail_idx: CachePadded::new(AtomicUsize::new(0)),
            head_idx: CachePadded::new(AtomicUsize::new(0)),
            ref_count: AtomicI64::new(chunk_size as i64),
        })
    }

    /// Prepares a chunk pulled out of `mem_cache` to be linked in as a new
    /// tail. Only the producer-facing fields are reset here: `head_idx`
    /// and `ref_count` are reset later, by the consumer that rotates onto
    /// this chunk (spec §4.6 step 5) — resetting them here would race with
    /// a consumer still draining this chunk from its *previous* life.
    pub(crate) fn reset_for_reuse(&self) {
        self.tail_idx.store(0, Ordering::Relaxed);
        self.next.store(ptr::null_mut(), Ordering::Relaxed);
        for slot in self.slots.iter() {
            slot.flag.store(0, Ordering::Relaxed);
        }
    }
}
