//! An elastic, chunked queue for one producer and many consumers.
//!
//! Grounded in `original_source/container/queue/spmc.go`. The source
//! offers two consumer designs; this crate implements the second, `ref`-
//! counted one the spec calls out as preferred, rather than the first
//! (which checks only an index overflow and relies on invariant I5 to
//! paper over a missing flag check).
//!
//! # Rotating the head chunk
//!
//! Consumers race for a slot on the current `head_chunk` via
//! `head_idx.fetch_add`, same ticketing as the MPSC ring's producers.
//! `ref_count` starts at `chunk_size` and is decremented once per
//! successful read; the consumer that brings it to zero is — by
//! construction — the last one to touch this chunk, so it alone performs
//! the rotation onto `head_chunk.next`, including resetting that successor
//! chunk's own `head_idx`/`ref_count` (which the producer's
//! `reset_for_reuse` deliberately leaves untouched, to avoid racing with a
//! consumer still draining the successor's *previous* life as a
//! `head_chunk`).

use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicI64, AtomicPtr, Ordering};

use crate::backoff::Backoff;
use crate::chunk::Chunk;
use crate::error::QueueError;
use crate::invariants::{debug_assert_non_null_chunk, debug_assert_ref_non_negative};
use crate::padding::CachePadded;
use crate::park::Park;
use crate::signal;

/// A single-producer, multi-consumer queue backed by a chain of
/// fixed-size chunks.
pub struct Chain<T> {
    tail_chunk: Cell<*mut Chunk<T>>,
    head_chunk: CachePadded<AtomicPtr<Chunk<T>>>,
    mem_cache: AtomicPtr<Chunk<T>>,
    num: CachePadded<AtomicI64>,
    park: Park,
    chunk_size: usize,
}

// Safety: `tail_chunk` is touched only by the single producer thread.
// `head_chunk` and each chunk's `head_idx`/`ref_count`/`flag`s coordinate
// the many consumer threads.
unsafe impl<T: Send> Send for Chain<T> {}
unsafe impl<T: Send> Sync for Chain<T> {}

impl<T> Chain<T> {
    /// Creates a chain queue whose chunks hold `chunk_size` slots each.
    pub fn new(chunk_size: i64) -> Result<Self, QueueError> {
        if chunk_size <= 0 {
            return Err(QueueError::InvalidSize(chunk_size));
        }
        let chunk_size = chunk_size as usize;
        let chunk = Box::into_raw(Chunk::new(chunk_size));
        Ok(Self {
            tail_chunk: Cell::new(chunk),
            head_chunk: CachePadded::new(AtomicPtr::new(chunk)),
            mem_cache: AtomicPtr::new(ptr::null_mut()),
            num: CachePadded::new(AtomicI64::new(0)),
            park: Park::new(),
            chunk_size,
        })
    }

    /// Publishes `value`. Must be called from a single producer thread.
    ///
    /// Like `spmc::Ring::push_tail`, the wakeup notification is a
    /// *blocking* send: with many consumers potentially parked, the
    /// producer must not drop a wakeup on the floor.
    pub fn push_tail(&self, value: T) {
        unsafe {
            let chunk_ptr = self.tail_chunk.get();
            let chunk = &*chunk_ptr;
            let idx = chunk.tail_idx.load(Ordering::Relaxed);
            let slot = &chunk.slots[idx];
            (*slot.value.get()).write(value);
            slot.flag.store(1, Ordering::Release);

            let idx = idx + 1;
            if idx == self.chunk_size {
                let recycled = self.mem_cache.swap(ptr::null_mut(), Ordering::AcqRel);
                let successor_ptr = if recycled.is_null() {
                    Box::into_raw(Chunk::new(self.chunk_size))
                } else {
                    (*recycled).reset_for_reuse();
                    recycled
                };
                chunk.next.store(successor_ptr, Ordering::Release);
                self.tail_chunk.set(successor_ptr);
            } else {
                chunk.tail_idx.store(idx, Ordering::Relaxed);
            }
        }

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

        let mut backoff = Backoff::new();
        loop {
            unsafe {
                let chunk_ptr = self.head_chunk.load(Ordering::Acquire);
                let chunk = &*chunk_ptr;

                let prev = chunk.head_idx.fetch_add(1, Ordering::AcqRel);
                let hi = prev + 1;
                if hi > self.chunk_size {
                    backoff.spin();
                    continue;
                }

                let idx = hi - 1;
                let slot = &chunk.slots[idx];
                let value = (*slot.value.get()).assume_init_read();
                slot.flag.store(0, Ordering::Release);

                let remaining = chunk.ref_count.fetch_sub(1, Ordering::AcqRel) - 1;
                debug_assert_ref_non_negative!(remaining);

                if remaining == 0 {
                    let next = chunk.next.load(Ordering::Acquire);
                    debug_assert_non_null_chunk!(next);
                    let next_chunk = &*next;
                    next_chunk.head_idx.store(0, Ordering::Relaxed);
                    next_chunk.ref_count.store(self.chunk_size as i64, Ordering::Relaxed);
                    chunk.next.store(ptr::null_mut(), Ordering::Relaxed);
                    self.head_chunk.store(next, Ordering::Release);

                    let stale = self.mem_cache.swap(chunk_ptr, Ordering::AcqRel);
                    if !stale.is_null() {
                        drop(Box::from_raw(stale));
                    }
                }

                return value;
            }
        }
    }

    /// The current pending-item count, clamped to zero.
    #[must_use]
    pub fn len(&self) -> i64 {
        signal::len(&self.num)
    }
}

impl<T> Drop for Chain<T> {
    fn drop(&mut self) {
        unsafe {
            let tail_chunk = self.tail_chunk.get();
            let mut chunk_ptr = *self.head_chunk.get_mut();

            loop {
                let chunk = &*chunk_ptr;
                for slot in chunk.slots.iter() {
                    if slot.flag.load(Ordering::Relaxed) != 0 {
                        (*slot.value.get()).assume_init_drop();
                    }
                }
                if chunk_ptr == tail_chunk {
                    drop(Box::from_raw(chunk_ptr));
                    break;
                }
                let next = chunk.next.load(Ordering::Relaxed);
                drop(Box::from_raw(chunk_ptr));
                chunk_ptr = next;
            }

            let cached = *self.mem_cache.get_mut();
            if !cached.is_null() {
                drop(Box::from_raw(cached));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicI64;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn rejects_non_positive_chunk_size() {
        assert_eq!(Chain::<u32>::new(0).unwrap_err(), QueueError::InvalidSize(0));
    }

    #[test]
    fn single_thread_fifo_across_chunk_boundary() {
        let chain = Chain::<u32>::new(4).unwrap();
        for i in 0..10 {
            chain.push_tail(i);
        }
        for i in 0..10 {
            assert_eq!(chain.pop_head(), i);
        }
    }

    #[test]
    fn scenario_s5_ref_counted_rotation() {
        const CHUNK_SIZE: u32 = 256;
        const TOTAL: u32 = 10_240;
        const CONSUMERS: usize = 16;

        let chain = Arc::new(Chain::<u32>::new(i64::from(CHUNK_SIZE)).unwrap());
        let received = Arc::new(Mutex::new(Vec::with_capacity(TOTAL as usize)));
        let permits = Arc::new(AtomicI64::new(i64::from(TOTAL)));

        let producer = {
            let chain = Arc::clone(&chain);
            thread::spawn(move || {
                for i in 0..TOTAL {
                    chain.push_tail(i);
                }
            })
        };

        let mut consumers = Vec::new();
        for _ in 0..CONSUMERS {
            let chain = Arc::clone(&chain);
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
                    local.push(chain.pop_head());
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
        assert_eq!(TOTAL / CHUNK_SIZE, 40);
    }
}
