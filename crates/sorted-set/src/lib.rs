//! The on-ledger sorted set of campaign participants.
//!
//! Nodes live in separate outputs linked by key in strictly ascending order, starting at a head
//! sentinel. [`store::SetStore`] is a read-only snapshot of those outputs and
//! [`mutator::SetMutator`] changes them one atomic transaction at a time.

pub mod deploy;
pub mod mutator;
pub mod store;
