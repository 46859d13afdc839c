//! The boundary between the campaign logic and the ledger.
//!
//! The ledger itself (key management, coin selection, serialization, submission) is an external
//! collaborator reached through the [`LedgerGateway`](gateway::LedgerGateway) trait. Operations
//! describe what they want to happen as a [`TxSkeleton`](skeleton::TxSkeleton) and hand it over
//! for balancing, signing and submission.

pub mod context;
pub mod errors;
pub mod gateway;
pub mod queries;
pub mod skeleton;
pub mod submit;
