use thiserror::Error;

/// Construction-time error for every queue in this crate.
///
/// This is the only error any constructor can return: once a queue exists,
/// `push_tail` and `pop_head` cannot fail (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The requested capacity or chunk size was not positive.
    #[error("capacity/chunk size must be positive, got {0}")]
    InvalidSize(i64),
}
