//! An unbounded-looking (elastic, chunked) queue for one producer and one
//! consumer, trading the ring's hard capacity for amortized allocation.
//!
//! Grounded in `original_source/container/queue/spsc.go`'s `spscChain`
//! and `spscChunk`. Since there is exactly one producer and one consumer,
//! chunk cursors need no atomics or per-slot flags — only the chunk `next`
//! pointer and the `mem_cache` recycling slot cross threads, and both are
//! handled with a single atomic swap each.

use std::cell::{Cell, UnsafeCell};
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicI64, AtomicPtr, Ordering};

use crate::error::QueueError;
use crate::invariants::debug_assert_non_null_chunk;
use crate::padding::CachePadded;
use crate::park::Park;
use crate::signal;

struct SpscChunk<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    next: AtomicPtr<SpscChunk<T>>,
}

impl<T> SpscChunk<T> {
    fn new(chunk_size: usize) -> Box<Self> {
        let slots = (0..chunk_size)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>();
        Box::new(Self {
            slots: slots.into_boxed_slice(),
            next: AtomicPtr::new(ptr::null_mut()),
        })
    }
}

/// A single-producer, single-consumer queue backed by a chain of fixed-size
/// chunks.
pub struct Chain<T> {
    tail_chunk: Cell<*mut SpscChunk<T>>,
    tail_idx: Cell<usize>,
    head_chunk: Cell<*mut SpscChunk<T>>,
    head_idx: Cell<usize>,
    mem_cache: AtomicPtr<SpscChunk<T>>,
    num: CachePadded<AtomicI64>,
    park: Park,
    chunk_size: usize,
}

// Safety: `tail_chunk`/`tail_idx` are touched only by the producer thread
// and `head_chunk`/`head_idx` only by the consumer thread; the only
// cross-thread state is `mem_cache` and each chunk's `next`, both atomic.
unsafe impl<T: Send> Send for Chain<T> {}
unsafe impl<T: Send> Sync for Chain<T> {}

impl<T> Chain<T> {
    /// Creates a chain queue whose chunks hold `chunk_size` slots each.
    pub fn new(chunk_size: i64) -> Result<Self, QueueError> {
        if chunk_size <= 0 {
            return Err(QueueError::InvalidSize(chunk_size));
        }
        let chunk_size = chunk_size as usize;
        let chunk = Box::into_raw(SpscChunk::new(chunk_size));
        Ok(Self {
            tail_chunk: Cell::new(chunk),
            tail_idx: Cell::new(0),
            head_chunk: Cell::new(chunk),
            head_idx: Cell::new(0),
            mem_cache: AtomicPtr::new(ptr::null_mut()),
            num: CachePadded::new(AtomicI64::new(0)),
            park: Park::new(),
            chunk_size,
        })
    }

    /// Publishes `value`, growing the chain (from `mem_cache` or a fresh
    /// allocation) if the current tail chunk is full.
    pub fn push_tail(&self, value: T) {
        unsafe {
            let chunk_ptr = self.tail_chunk.get();
            let chunk = &*chunk_ptr;
            let idx = self.tail_idx.get();
            (*chunk.slots[idx].get()).write(value);

            let idx = idx + 1;
            if idx == self.chunk_size {
                let recycled = self.mem_cache.swap(ptr::null_mut(), Ordering::AcqRel);
                let successor_ptr = if recycled.is_null() {
                    Box::into_raw(SpscChunk::new(self.chunk_size))
                } else {
                    recycled
                };
                chunk.next.store(successor_ptr, Ordering::Release);
                self.tail_chunk.set(successor_ptr);
                self.tail_idx.set(0);
            } else {
                self.tail_idx.set(idx);
            }
        }

        if signal::on_push(&self.num) {
            self.park.notify();
        }
    }

    /// Removes and returns the oldest value, rotating onto the next chunk
    /// and recycling the drained one if necessary.
    pub fn pop_head(&self) -> T {
        if signal::on_pop_must_park(&self.num) {
            self.park.wait();
        }
        unsafe {
            let chunk_ptr = self.head_chunk.get();
            let chunk = &*chunk_ptr;
            let idx = self.head_idx.get();
            let value = (*chunk.slots[idx].get()).assume_init_read();

            let idx = idx + 1;
            if idx == self.chunk_size {
                let next = chunk.next.load(Ordering::Acquire);
                debug_assert_non_null_chunk!(next);
                chunk.next.store(ptr::null_mut(), Ordering::Relaxed);
                self.head_chunk.set(next);
                self.head_idx.set(0);

                let stale = self.mem_cache.swap(chunk_ptr, Ordering::AcqRel);
                if !stale.is_null() {
                    drop(Box::from_raw(stale));
                }
            } else {
                self.head_idx.set(idx);
            }

            value
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
            let tail_idx = self.tail_idx.get();
            let mut chunk_ptr = self.head_chunk.get();
            let mut idx = self.head_idx.get();

            loop {
                let chunk = &*chunk_ptr;
                let end = if chunk_ptr == tail_chunk {
                    tail_idx
                } else {
                    self.chunk_size
                };
                while idx < end {
                    (*chunk.slots[idx].get()).assume_init_drop();
                    idx += 1;
                }
                if chunk_ptr == tail_chunk {
                    drop(Box::from_raw(chunk_ptr));
                    break;
                }
                let next = chunk.next.load(Ordering::Relaxed);
                drop(Box::from_raw(chunk_ptr));
                chunk_ptr = next;
                idx = 0;
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
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn rejects_non_positive_chunk_size() {
        assert_eq!(Chain::<u32>::new(0).unwrap_err(), QueueError::InvalidSize(0));
    }

    #[test]
    fn single_thread_fifo_across_chunk_boundary() {
        let chain = Chain::<u32>::new(2).unwrap();
        for i in 0..6 {
            chain.push_tail(i);
        }
        for i in 0..6 {
            assert_eq!(chain.pop_head(), i);
        }
    }

    #[test]
    fn recycles_drained_chunks_through_mem_cache() {
        let chain = Chain::<u32>::new(2).unwrap();
        for round in 0..4u32 {
            chain.push_tail(round * 2);
            chain.push_tail(round * 2 + 1);
            assert_eq!(chain.pop_head(), round * 2);
            assert_eq!(chain.pop_head(), round * 2 + 1);
        }
    }

    #[test]
    fn concurrent_producer_consumer() {
        let chain = Arc::new(Chain::<u32>::new(8).unwrap());
        let producer = {
            let chain = Arc::clone(&chain);
            thread::spawn(move || {
                for i in 0..2000u32 {
                    chain.push_tail(i);
                }
            })
        };
        for i in 0..2000u32 {
            assert_eq!(chain.pop_head(), i);
        }
        producer.join().unwrap();
    }
}
