//! One producer, many consumers.
//!
//! Both variants diverge from SPSC/MPSC in one respect that's easy to
//! miss: the wakeup send on the producer's side is *blocking*, not
//! drop-on-full (spec §4.5/§4.6, §5, and Open Questions). With many
//! consumers potentially parked on the single notification slot, a
//! producer that raced ahead with a non-blocking send could starve a
//! consumer the drop silently discarded a wakeup for.

mod chain;
mod ring;

pub use chain::Chain;
pub use ring::Ring;
