//! A family of lock-free / wait-lean bounded queues for specific
//! producer/consumer cardinalities.
//!
//! Six queues, each parameterized over a payload type `T`:
//!
//! | Module | Producers | Consumers | Storage |
//! |---|---|---|---|
//! | [`spsc::Ring`] | 1 | 1 | power-of-two ring |
//! | [`spsc::Chain`] | 1 | 1 | linked fixed-size chunks |
//! | [`mpsc::Ring`] | N | 1 | power-of-two ring |
//! | [`mpsc::Chain`] | N | 1 | linked fixed-size chunks |
//! | [`spmc::Ring`] | 1 | N | power-of-two ring |
//! | [`spmc::Chain`] | 1 | N | linked fixed-size chunks |
//!
//! Every queue exposes the same three operations: `push_tail(value)`,
//! `pop_head() -> value`, `len() -> i64`. Coordination between producers
//! and consumers rests on a shared `num: AtomicI64` that doubles as a
//! pending-item count and a parked-consumer indicator, plus a one-slot
//! `park` rendezvous used to suspend/resume the side that's waiting.
//!
//! Out of scope, deliberately: unbounded queues, MPMC, priorities,
//! persistence, cross-process shared memory, fairness between producers,
//! strict FIFO across producers in MPSC (only per-producer order holds),
//! iteration/inspection, predicate removal.
//!
//! # Example
//!
//! ```
//! use ringfamily::mpsc;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(mpsc::Ring::<u32>::new(16).unwrap());
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..100 {
//!             queue.push_tail(i);
//!         }
//!     })
//! };
//!
//! for _ in 0..100 {
//!     queue.pop_head();
//! }
//! producer.join().unwrap();
//! ```

mod chunk;
mod invariants;
mod signal;

pub mod backoff;
pub mod error;
pub mod padding;
pub mod park;
pub mod pow2;
pub mod spinlock;

pub mod mpsc;
pub mod spmc;
pub mod spsc;

pub use error::QueueError;
pub use padding::CachePadded;
pub use park::Park;
pub use spinlock::SpinLock;
