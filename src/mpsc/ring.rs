//! A bounded power-of-two ring buffer for many producers and one consumer.
//!
//! # Memory ordering
//!
//! `tail_idx.fetch_add` is the serialization point between producers: each
//! call returns a distinct ticket, so two producers never write the same
//! slot. A producer that wins a low ticket but stalls before its flag
//! store holds up the consumer at that slot — by design (spec §4.3): the
//! consumer's wait loop on `flag` is what turns per-ticket ordering into
//! per-producer FIFO, at the cost of blocking behind a slow producer.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};

use crate::backoff::Backoff;
use crate::error::QueueError;
use crate::invariants::debug_assert_monotonic;
use crate::padding::CachePadded;
use crate::park::Park;
use crate::pow2::ceil_to_power_of_two;
use crate::signal;

struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
    flag: AtomicU8,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            flag: AtomicU8::new(0),
        }
    }
}

unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

/// A many-producer, single-consumer bounded ring buffer.
pub struct Ring<T> {
    tail_idx: CachePadded<AtomicU64>,
    head_idx: CachePadded<AtomicU64>,
    num: CachePadded<AtomicI64>,
    park: Park,
    slots: Box<[Slot<T>]>,
    capacity: usize,
    mask: usize,
}

unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    /// Creates a ring whose effective capacity is `capacity` rounded up to
    /// the next power of two.
    pub fn new(capacity: i64) -> Result<Self, QueueError> {
        if capacity <= 0 {
            return Err(QueueError::InvalidSize(capacity));
        }
        let capacity = ceil_to_power_of_two(capacity as u64) as usize;
        let slots = (0..capacity).map(|_| Slot::empty()).collect::<Vec<_>>();
        Ok(Self {
            tail_idx: CachePadded::new(AtomicU64::new(0)),
            head_idx: CachePadded::new(AtomicU64::new(0)),
            num: CachePadded::new(AtomicI64::new(0)),
            park: Park::new(),
            slots: slots.into_boxed_slice(),
            capacity,
            mask: capacity - 1,
        })
    }

    /// The effective, power-of-two capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Publishes `value`. May be called concurrently from any number of
    /// producer threads.
    pub fn push_tail(&self, value: T) {
        let ti = self.tail_idx.fetch_add(1, Ordering::Relaxed);

        let mut backoff = Backoff::new();
        while ti >= self.head_idx.load(Ordering::Acquire).wrapping_add(self.capacity as u64) {
            backoff.snooze();
        }

        let idx = (ti as usize) & self.mask;
        let slot = &self.slots[idx];
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.flag.store(1, Ordering::Release);

        if signal::on_push(&self.num) {
            self.park.notify();
        }
    }

    /// Removes and returns the oldest value. Must be called from a single
    /// consumer thread.
    pub fn pop_head(&self) -> T {
        if signal::on_pop_must_park(&self.num) {
            self.park.wait();
        }

        let head = self.head_idx.load(Ordering::Relaxed);
        let idx = (head as usize) & self.mask;
        let slot = &self.slots[idx];

        let mut backoff = Backoff::new();
        while slot.flag.load(Ordering::Acquire) == 0 {
            backoff.snooze();
        }

        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.flag.store(0, Ordering::Release);
        debug_assert_monotonic!("head_idx", head, head.wrapping_add(1));
        self.head_idx.store(head.wrapping_add(1), Ordering::Release);
        value
    }

    /// The current pending-item count, clamped to zero.
    #[must_use]
    pub fn len(&self) -> i64 {
        signal::len(&self.num)
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if *slot.flag.get_mut() != 0 {
                unsafe {
                    (*slot.value.get()).assume_init_drop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rejects_non_positive_capacity() {
        assert_eq!(Ring::<u32>::new(0).unwrap_err(), QueueError::InvalidSize(0));
    }

    #[test]
    fn single_thread_fifo() {
        let ring = Ring::<u32>::new(16).unwrap();
        for i in 0..10 {
            ring.push_tail(i);
        }
        for i in 0..10 {
            assert_eq!(ring.pop_head(), i);
        }
    }

    #[test]
    fn scenario_s2_per_producer_fifo() {
        const PRODUCERS: u32 = 4;
        const PER_PRODUCER: u32 = 100;

        let ring = Arc::new(Ring::<u32>::new(16).unwrap());
        let mut handles = Vec::new();
        for p in 0..PRODUCERS {
            let ring = Arc::clone(&ring);
            handles.push(thread::spawn(move || {
                let base = p * PER_PRODUCER;
                for i in 0..PER_PRODUCER {
                    ring.push_tail(base + i);
                }
            }));
        }

        let mut received = Vec::new();
        for _ in 0..(PRODUCERS * PER_PRODUCER) {
            received.push(ring.pop_head());
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(received.len(), (PRODUCERS * PER_PRODUCER) as usize);
        assert_eq!(received.iter().copied().collect::<HashSet<_>>().len(), received.len());

        for p in 0..PRODUCERS {
            let base = p * PER_PRODUCER;
            let subsequence: Vec<u32> = received
                .iter()
                .copied()
                .filter(|&v| v / PER_PRODUCER == p)
                .collect();
            let expected: Vec<u32> = (base..base + PER_PRODUCER).collect();
            assert_eq!(subsequence, expected, "producer {p} out of order");
        }
    }
}
