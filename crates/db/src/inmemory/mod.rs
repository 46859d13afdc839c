//! In-memory journal.

pub mod journal;

pub use journal::JournalInMemory;
