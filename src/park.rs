//! The capacity-one parked-consumer (and, for SPMC, parked-producer)
//! wakeup channel described in spec §3/§5.
//!
//! The Go original builds this from `make(chan struct{}, 1)`: producers
//! signal with a non-blocking `select { case ch <- struct{}{}: default: }`,
//! consumers signal (SPMC only) by blocking on `ch <- struct{}{}`, and
//! every consumer wakes with a blocking `<-ch`. `std::sync::mpsc`'s
//! `sync_channel(1)` has exactly that shape: `try_send` drops the token
//! when the one slot is occupied, plain `send` blocks until the slot is
//! free, and `recv` blocks until a token arrives.
//!
//! `SyncSender` is already `Sync` (the channel is built for multiple
//! senders), but `Receiver` deliberately is not — the standard library
//! gives no guarantee that concurrent `recv()` calls from multiple threads
//! on a shared `&Receiver` are safe. SPMC's many consumers all call
//! `wait()` on the same `Park`, so the receive side is guarded by a
//! `Mutex` rather than asserted `Sync`.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::Mutex;

/// A capacity-one rendezvous used to park/wake a blocked thread.
pub struct Park {
    tx: SyncSender<()>,
    rx: Mutex<Receiver<()>>,
}

impl Park {
    /// Creates a new, empty parking slot.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = sync_channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Sends a wakeup token without blocking. If the slot is already full
    /// the token is silently dropped — exactly the `select ... default`
    /// behavior the SPSC/MPSC producers rely on.
    pub fn notify(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => unreachable!("receiver half is held by self"),
        }
    }

    /// Sends a wakeup token, blocking until the slot is free.
    ///
    /// Used only by the SPMC producer, which per spec §4.5/§5 must not
    /// race ahead of the single signaling slot when consumers may already
    /// be parked on it.
    pub fn notify_blocking(&self) {
        self.tx.send(()).expect("receiver half is held by self");
    }

    /// Blocks until a wakeup token is available, then consumes it. Safe to
    /// call from any number of consumer threads concurrently: the receive
    /// side is serialized by an internal mutex, so at most one thread is
    /// ever inside `recv()` at a time.
    pub fn wait(&self) {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner());
        rx.recv().expect("sender half is held by self");
    }

    /// Non-blocking drain, used only by tests that want to assert on
    /// pending-token state without actually parking.
    #[cfg(test)]
    fn try_wait(&self) -> bool {
        let rx = self.rx.lock().unwrap_or_else(|e| e.into_inner());
        match rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => unreachable!("sender half is held by self"),
        }
    }
}

impl Default for Park {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn notify_then_wait_consumes_token() {
        let park = Park::new();
        park.notify();
        assert!(park.try_wait());
        assert!(!park.try_wait());
    }

    #[test]
    fn notify_drops_on_full_slot() {
        let park = Park::new();
        park.notify();
        park.notify(); // second token is dropped, not queued
        assert!(park.try_wait());
        assert!(!park.try_wait());
    }

    #[test]
    fn wait_blocks_until_notified() {
        let park = Arc::new(Park::new());
        let waiter = Arc::clone(&park);
        let handle = thread::spawn(move || {
            waiter.wait();
        });

        thread::sleep(Duration::from_millis(20));
        park.notify();
        handle.join().unwrap();
    }

    #[test]
    fn many_consumers_can_share_wait() {
        let park = Arc::new(Park::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let park = Arc::clone(&park);
            handles.push(thread::spawn(move || park.wait()));
        }

        for _ in 0..8 {
            park.notify_blocking();
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
