//! Batched traversals of the sorted set.
//!
//! The commit fold walks the set once after staking ends and sums every stake into a singleton
//! accumulator. The reward fold walks it a second time, paying each node its share of the reward
//! pool. Both advance one contiguous batch per transaction, starting where the accumulator's
//! pointer says, so a failed or lost transaction is simply retried from a fresh snapshot.

pub mod batch;
pub mod commit;
pub mod reward;
