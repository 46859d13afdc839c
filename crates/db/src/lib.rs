//! Persistence of the orchestrator's submission journal.
//!
//! The journal holds at most one entry per campaign: the transaction the orchestrator is about to
//! submit or is waiting on. [`inmemory::JournalInMemory`] serves tests and throwaway runs,
//! [`persistent::sqlite::SqliteJournal`] survives restarts.

pub mod errors;
pub mod inmemory;
pub mod journal;
pub mod persistent;
