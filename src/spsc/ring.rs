//! A bounded power-of-two ring buffer for one producer and one consumer.
//!
//! # Memory ordering
//!
//! `tail_idx` is written only by the producer and read by the consumer;
//! `head_idx` is written only by the consumer and read by the producer.
//! The value store at `slot[tail_idx & mask]` happens-before the
//! `tail_idx` release store, so once the consumer observes the new
//! `tail_idx` (via an acquire load, directly or transitively through
//! `num`/`park`), the value is visible. Symmetrically for `head_idx` and
//! the producer's full check.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use crate::backoff::Backoff;
use crate::error::QueueError;
use crate::invariants::{debug_assert_monotonic, debug_assert_ring_bounds};
use crate::padding::CachePadded;
use crate::park::Park;
use crate::pow2::ceil_to_power_of_two;
use crate::signal;

/// A single-producer, single-consumer bounded ring buffer.
pub struct Ring<T> {
    head_idx: CachePadded<AtomicU64>,
    tail_idx: CachePadded<AtomicU64>,
    num: CachePadded<AtomicI64>,
    park: Park,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    capacity: usize,
    mask: usize,
}

// Safety: the slot array is accessed by the producer only through indices
// below `tail_idx` and by the consumer only through indices below
// `head_idx`; the two never overlap (I2), and cross-thread visibility is
// established by the `tail_idx`/`head_idx` release/acquire pairs.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Creates a ring whose effective capacity is `capacity` rounded up to
    /// the next power of two (spec §6, §8 property 5).
    pub fn new(capacity: i64) -> Result<Self, QueueError> {
        if capacity <= 0 {
            return Err(QueueError::InvalidSize(capacity));
        }
        let capacity = ceil_to_power_of_two(capacity as u64) as usize;
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            head_idx: CachePadded::new(AtomicU64::new(0)),
            tail_idx: CachePadded::new(AtomicU64::new(0)),
            num: CachePadded::new(AtomicI64::new(0)),
            park: Park::new(),
            slots,
            capacity,
            mask: capacity - 1,
        })
    }

    /// The effective, power-of-two capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publishes `value`. Blocks (spinning) the calling producer thread
    /// until a slot is free.
    pub fn push_tail(&self, value: T) {
        let tail = self.tail_idx.load(Ordering::Relaxed);
        let mut backoff = Backoff::new();
        loop {
            let head = self.head_idx.load(Ordering::Acquire);
            if tail.wrapping_sub(head) < self.capacity as u64 {
                break;
            }
            backoff.snooze();
        }
        debug_assert_ring_bounds!(self.head_idx.load(Ordering::Relaxed), tail, self.capacity);

        let idx = (tail as usize) & self.mask;
        unsafe {
            (*self.slots[idx].get()).write(value);
        }
        debug_assert_monotonic!("tail_idx", tail, tail.wrapping_add(1));
        self.tail_idx.store(tail.wrapping_add(1), Ordering::Release);

        if signal::on_push(&self.num) {
            self.park.notify();
        }
    }

    /// Removes and returns the oldest value. Blocks the calling consumer
    /// thread until a value is available.
    pub fn pop_head(&self) -> T {
        if signal::on_pop_must_park(&self.num) {
            self.park.wait();
        }
        let head = self.head_idx.load(Ordering::Relaxed);
        let idx = (head as usize) & self.mask;
        let value = unsafe { (*self.slots[idx].get()).assume_init_read() };
        debug_assert_monotonic!("head_idx", head, head.wrapping_add(1));
        self.head_idx.store(head.wrapping_add(1), Ordering::Release);
        value
    }

    /// The current pending-item count, clamped to zero.
    #[must_use]
    pub fn len(&self) -> i64 {
        signal::len(&self.num)
    }

    /// `true` if no items are currently pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let mut head = *self.head_idx.get_mut();
        let tail = *self.tail_idx.get_mut();
        while head != tail {
            let idx = (head as usize) & self.mask;
            unsafe {
                (*self.slots[idx].get()).assume_init_drop();
            }
            head = head.wrapping_add(1);
        }
    }
}
