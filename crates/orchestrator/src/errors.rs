//! Error types for the orchestrator crate.

use campaign_db::errors::DbError;
use campaign_primitives::{duties::CampaignDuty, errors::CampaignError};
use campaign_sm::driver::DriverError;
use thiserror::Error;

/// Errors that stop the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A campaign operation failed in a way the driver does not handle, e.g. while observing.
    #[error("campaign: {0}")]
    Campaign(#[from] CampaignError),

    /// The journal could not be read or written.
    #[error("journal: {0}")]
    Journal(#[from] DbError),

    /// The driver received an event it cannot handle.
    #[error("driver: {0}")]
    Driver(#[from] DriverError),

    /// A duty failed on every attempt and the campaign did not move on.
    #[error("{duty} failed on every attempt: {reason}")]
    Exhausted {
        /// The failed duty.
        duty: CampaignDuty,
        /// Reason of the last failure.
        reason: String,
    },

    /// The driver stopped asking for work without reaching a terminal state.
    #[error("driver stalled in {0}")]
    Stalled(String),
}

/// Result type of the orchestrator.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
