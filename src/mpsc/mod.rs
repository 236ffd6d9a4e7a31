//! Many producers, one consumer.
//!
//! Producer serialization is CAS-free: every producer claims a slot or a
//! chunk index with a single `fetch_add`, so contention degrades to cache
//! coherency traffic rather than retry storms. Order is preserved
//! per-producer, not globally (spec §1 non-goal): two producers racing for
//! adjacent indices may interleave their messages arbitrarily, but neither
//! ever sees its own messages reordered.

mod chain;
mod ring;

pub use chain::Chain;
pub use ring::Ring;
