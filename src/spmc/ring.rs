//! A bounded power-of-two ring buffer for one producer and many consumers.
//!
//! Cells must be explicitly emptied (`flag = 0`) by a consumer before the
//! single producer may reuse them, so the producer's full check here spins
//! on the flag of the specific slot it's about to overwrite rather than on
//! an index distance as in the SPSC/MPSC rings.

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;

use crate::backoff::Backoff;
use crate::error::QueueError;
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

/// A single-producer, multi-consumer bounded ring buffer.
pub struct Ring<T> {
    tail_idx: Cell<u64>,
    head_idx: CachePadded<AtomicU64>,
    num: CachePadded<AtomicI64>,
    park: Park,
    slots: Box<[Slot<T>]>,
    capacity: usize,
    mask: usize,
}

// Safety: `tail_idx` is touched only by the single producer thread.
// `head_idx` is a shared ticket counter for consumers; each ticket names
// exactly one slot, and a slot's flag gates both the producer's reuse and
// the consumer's read.
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
            tail_idx: Cell::new(0),
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

    /// Publishes `value`. Must be called from a single producer thread.
    ///
    /// Notifying a parked consumer is a *blocking* send here: with many
    /// consumers potentially waiting on the one-slot channel, the producer
    /// must not race ahead of a notification that hasn't yet been
    /// delivered (spec §4.5).
    pub fn push_tail(&self, value: T) {
        let ti = self.tail_idx.get();
        let idx = (ti as usize) & self.mask;
        let slot = &self.slots[idx];

        let mut backoff = Backoff::new();
        while slot.flag.load(Ordering::Acquire) != 0 {
            backoff.snooze();
        }

        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.flag.store(1, Ordering::Release);
        self.tail_idx.set(ti.wrapping_add(1));

        if signal::on_push(&self.num) {
            self.park.notify_blocking();
        }
    }

    /// Removes and returns one value. May be called concurrently from any
    /// number of consumer threads; each value is delivered to exactly one
    /// caller.
    pub fn pop_head(&self) -> T {
        if signal::on_pop_must_park(&self.num) {
            self.park.wait();
        }

        let hi = self.head_idx.fetch_add(1, Ordering::AcqRel);
        let idx = (hi as usize) & self.mask;
        let slot = &self.slots[idx];
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.flag.store(0, Ordering::Release);
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
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn rejects_non_positive_capacity() {
        assert_eq!(Ring::<u32>::new(0).unwrap_err(), QueueError::InvalidSize(0));
    }

    #[test]
    fn single_thread_fifo() {
        let ring = Ring::<u32>::new(4).unwrap();
        for i in 0..4 {
            ring.push_tail(i);
        }
        for i in 0..4 {
            assert_eq!(ring.pop_head(), i);
        }
    }

    #[test]
    fn scenario_s4_each_item_delivered_once() {
        use std::sync::atomic::AtomicI64;

        const TOTAL: u32 = 20_000;
        const CONSUMERS: usize = 8;

        let ring = Arc::new(Ring::<u32>::new(256).unwrap());
        let received = Arc::new(Mutex::new(Vec::with_capacity(TOTAL as usize)));
        // Bounds how many `pop_head` calls consumers collectively make, so
        // none of them blocks forever waiting for an item past the last one
        // the producer sends.
        let permits = Arc::new(AtomicI64::new(i64::from(TOTAL)));

        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..TOTAL {
                    ring.push_tail(i);
                }
            })
        };

        let mut consumers = Vec::new();
        for _ in 0..CONSUMERS {
            let ring = Arc::clone(&ring);
            let received = Arc::clone(&received);
            let permits = Arc::clone(&permits);
            consumers.push(thread::spawn(move || {
                let mut local = Vec::new();
                loop {
                    let prev = permits.fetch_sub(1, Ordering::AcqRel);
                    if prev <= 0 {
                        permits.fetch_add(1, Ordering::AcqRel);
                        break;
                    }
                    local.push(ring.pop_head());
                }
                received.lock().unwrap().extend(local);
            }));
        }

        producer.join().unwrap();
        for c in consumers {
            c.join().unwrap();
        }

        let received = received.lock().unwrap();
        assert_eq!(received.len(), TOTAL as usize);
        assert_eq!(received.iter().copied().collect::<HashSet<_>>().len(), TOTAL as usize);
    }
}
