//! Testing utilities for state machines implementing
//! [`StateMachine`](crate::state_machine::StateMachine).
//!
//! - [`fixtures`]: proptest strategies for driver states and events
//! - [`transition`]: value-based transition helpers
//! - [`proptest`]: property macros (determinism, terminal states, no silent acceptance)

pub(crate) mod fixtures;
pub(crate) mod proptest;
pub(crate) mod transition;
