//! This crate contains general types, traits and pure functions that need to be shared across
//! multiple crates in the campaign workspace.
//!
//! It lies at the bottom of the crate-hierarchy in this workspace i.e., it does not depend on any
//! other crate in this workspace. Everything that has to agree byte-for-byte with the on-ledger
//! authorization scripts (record and operation encodings) lives here.

pub mod address;
pub mod constants;
pub mod datums;
pub mod duties;
pub mod errors;
pub mod hashes;
pub mod plutus;
pub mod redeemers;
pub mod time;
pub mod utxo;
pub mod value;
