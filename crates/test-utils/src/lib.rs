//! This crate provides test utilities for the campaign workspace: an in-memory ledger that
//! enforces the balancing and conflict rules of the real one, deterministic fixtures and
//! proptest strategies.

pub mod emulator;
pub mod fixtures;
