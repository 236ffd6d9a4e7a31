//! Single-producer, single-consumer queues.
//!
//! Exactly one thread may call `push_tail`, and exactly one (possibly
//! different) thread may call `pop_head`. Neither variant needs a per-slot
//! publish flag: the `num` counter and the one-slot `park` rendezvous
//! already establish the producer-to-consumer happens-before edge, so a
//! slot's occupancy is fully described by the two cursors (spec §3).

mod chain;
mod ring;

pub use chain::Chain;
pub use ring::Ring;
