//! The orchestrator's retry and confirmation automaton.
//!
//! The driver does not touch the ledger. Its caller executes the [`DriverDuty`] it emits and
//! feeds the outcome back as a [`DriverEvent`]. A duty that keeps failing is retried up to
//! [`DriverConfig::max_attempts`] times, each retry preceded by a fresh observation: if the
//! campaign moved on in the meantime (an attempt that looked failed did land), the driver follows
//! the new plan instead of failing.

pub mod config;
pub mod duties;
pub mod errors;
pub mod events;
pub mod machine;
pub mod state;

pub use config::DriverConfig;
pub use duties::DriverDuty;
pub use errors::{DriverError, DriverResult};
pub use events::{DriverEvent, Recovery};
pub use machine::{CampaignDriver, DriverOutput};
pub use state::{DriverState, PendingRetry};
