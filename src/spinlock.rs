//! A tiny, non-reentrant spin lock with jittered backoff.
//!
//! Ported from `original_source/container/lock/spin.go`. The Go source
//! draws a jitter value from the runtime's `fastrand` and spins for that
//! many cycles via `runtime.procyield`; here the same shape is built from a
//! small xorshift generator and [`std::hint::spin_loop`]. Not used on the
//! hot path of any queue in this crate — it's offered for callers who need
//! a very short critical section of their own.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

/// A spin lock backed by a single `AtomicBool`.
///
/// Not reentrant: locking twice from the same thread deadlocks.
#[derive(Debug, Default)]
pub struct SpinLock {
    locked: AtomicBool,
}

impl SpinLock {
    /// Creates a new, unlocked spin lock.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    /// Acquires the lock, spinning with jittered backoff until it succeeds.
    pub fn lock(&self) {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }

        loop {
            let r = jitter();
            for _ in 0..r {
                std::hint::spin_loop();
            }
            if self
                .locked
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Releases the lock.
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Attempts to acquire the lock without spinning.
    ///
    /// Returns `true` if the lock was acquired. The Go original's
    /// `TryLock` is an empty stub (spec's Open Questions calls this out as
    /// a known gap, not a behavior to preserve), so this is a real,
    /// correct, single-CAS attempt.
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }
}

thread_local! {
    static RNG_STATE: Cell<u32> = Cell::new(0x9E37_79B9);
}

/// Draws a jitter value in `[30, 99]`, mirroring the Go source's
/// `r := link.FastRand() % 100; if r < 30 { r = 30 }`.
fn jitter() -> u32 {
    let r = RNG_STATE.with(|state| {
        let mut x = state.get();
        // xorshift32
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state.set(x);
        x
    });
    (r % 100).max(30)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn try_lock_then_unlock() {
        let lock = SpinLock::new();
        assert!(lock.try_lock());
        assert!(!lock.try_lock());
        lock.unlock();
        assert!(lock.try_lock());
    }

    #[test]
    fn mutual_exclusion_under_contention() {
        let lock = Arc::new(SpinLock::new());
        let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    lock.lock();
                    let v = counter.load(Ordering::Relaxed);
                    counter.store(v + 1, Ordering::Relaxed);
                    lock.unlock();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::Relaxed), 8000);
    }
}
