//! An elastic, chunked queue for many producers and one consumer.
//!
//! Grounded in `original_source/container/queue/mpsc.go`'s `mpscChain`.
//!
//! # The overflow race
//!
//! Every producer claims an index via `tail_idx.fetch_add` on whatever
//! chunk it last observed as `tail_chunk`. Three outcomes:
//!
//! - `ti <= chunk_size`: a real slot (`ti - 1`, zero-based) on this chunk.
//!   `ti == chunk_size` additionally means *this* producer is the one that
//!   filled the chunk, so after publishing its own value it also installs
//!   the successor chunk.
//! - `ti > chunk_size`: this producer loaded `tail_chunk` before the
//!   overflow producer's swap, and lost the race — it backs off and
//!   retries against the (by-then-updated) `tail_chunk`.
//!
//! The overflow producer writes its own slot (`chunk_size - 1`) and
//! releases its flag *before* publishing the new `tail_chunk` pointer.
//! This ordering matters: the consumer only follows `head_chunk.next` once
//! it has drained every flagged slot on the current chunk, so the last
//! slot's flag must already be visible by the time any consumer could
//! reach it — publishing the pointer first would let a retrying producer
//! race ahead of that final flag store.

use std::cell::Cell;
use std::ptr;
use std::sync::atomic::{AtomicI64, AtomicPtr, Ordering};

use crate::backoff::Backoff;
use crate::chunk::Chunk;
use crate::error::QueueError;
use crate::invariants::{debug_assert_flag_published, debug_assert_non_null_chunk};
use crate::padding::CachePadded;
use crate::park::Park;
use crate::signal;

/// A many-producer, single-consumer queue backed by a chain of fixed-size
/// chunks.
pub struct Chain<T> {
    tail_chunk: CachePadded<AtomicPtr<Chunk<T>>>,
    head_chunk: Cell<*mut Chunk<T>>,
    head_idx: Cell<usize>,
    mem_cache: AtomicPtr<Chunk<T>>,
    num: CachePadded<AtomicI64>,
    park: Park,
    chunk_size: usize,
}

// Safety: `head_chunk`/`head_idx` are touched only by the single consumer
// thread. Every other field is atomic, and chunk contents are guarded by
// per-slot flags plus the `tail_idx` fetch_add ticketing.
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
            tail_chunk: CachePadded::new(AtomicPtr::new(chunk)),
            head_chunk: Cell::new(chunk),
            head_idx: Cell::new(0),
            mem_cache: AtomicPtr::new(ptr::null_mut()),
            num: CachePadded::new(AtomicI64::new(0)),
            park: Park::new(),
            chunk_size,
        })
    }

    /// Publishes `value`. May be called concurrently from any number of
    /// producer threads.
    pub fn push_tail(&self, value: T) {
        let mut backoff = Backoff::new();
        loop {
            let chunk_ptr = self.tail_chunk.load(Ordering::Acquire);
            let chunk = unsafe { &*chunk_ptr };

            let prev = chunk.tail_idx.fetch_add(1, Ordering::AcqRel);
            let ti = prev + 1;
            if ti > self.chunk_size {
                backoff.spin();
                continue;
            }

            let idx = ti - 1;
            let slot = &chunk.slots[idx];
            unsafe {
                (*slot.value.get()).write(value);
            }
            slot.flag.store(1, Ordering::Release);

            if ti == self.chunk_size {
                let recycled = self.mem_cache.swap(ptr::null_mut(), Ordering::AcqRel);
                let successor_ptr = if recycled.is_null() {
                    Box::into_raw(Chunk::new(self.chunk_size))
                } else {
                    unsafe { (*recycled).reset_for_reuse() };
                    recycled
                };
                chunk.next.store(successor_ptr, Ordering::Release);
                self.tail_chunk.store(successor_ptr, Ordering::Release);
            }
            break;
        }

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

        unsafe {
            let chunk_ptr = self.head_chunk.get();
            let chunk = &*chunk_ptr;
            let idx = self.head_idx.get();
            let slot = &chunk.slots[idx];

            let mut backoff = Backoff::new();
            while slot.flag.load(Ordering::Acquire) == 0 {
                backoff.snooze();
            }
            debug_assert_flag_published!(slot.flag.load(Ordering::Relaxed) != 0);

            let value = (*slot.value.get()).assume_init_read();
            slot.flag.store(0, Ordering::Release);

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
            let tail_chunk = *self.tail_chunk.get_mut();
            let mut chunk_ptr = self.head_chunk.get();
            let mut idx = self.head_idx.get();

            loop {
                let chunk = &*chunk_ptr;
                let end = if chunk_ptr == tail_chunk {
                    chunk.tail_idx.load(Ordering::Relaxed).min(self.chunk_size)
                } else {
                    self.chunk_size
                };
                while idx < end {
                    if chunk.slots[idx].flag.load(Ordering::Relaxed) != 0 {
                        (*chunk.slots[idx].value.get()).assume_init_drop();
                    }
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
