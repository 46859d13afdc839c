//! States of the driver.

use std::fmt;

use campaign_primitives::{duties::CampaignDuty, hashes::TxId};
use serde::{Deserialize, Serialize};

/// A duty that failed and is waiting for the next observation to decide its fate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRetry {
    /// The failed duty.
    pub duty: CampaignDuty,
    /// Attempts made so far.
    pub attempts: u32,
    /// No attempts are left; the duty fails if it is planned again.
    pub exhausted: bool,
    /// Reason of the last failure.
    pub last_error: String,
}

/// State of the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    /// Waiting for the journal to be read.
    Recovering,

    /// Waiting for a snapshot.
    Observing {
        /// A failed duty to retry if it is still the plan.
        retry: Option<PendingRetry>,
    },

    /// Waiting for the transaction of `duty` to be submitted.
    Executing {
        /// The duty being executed.
        duty: CampaignDuty,
        /// 1-based attempt number.
        attempt: u32,
    },

    /// Waiting for a submitted transaction to be included.
    Confirming {
        /// The duty being executed.
        duty: CampaignDuty,
        /// 1-based attempt number.
        attempt: u32,
        /// The submitted transaction.
        tx_id: TxId,
    },

    /// Pausing before the next attempt of `duty`.
    Retrying {
        /// The failed duty.
        duty: CampaignDuty,
        /// Attempts made so far.
        attempt: u32,
        /// Reason of the failure.
        reason: String,
    },

    /// Pausing until the campaign needs something.
    Waiting {
        /// The planned non-submitting duty.
        duty: CampaignDuty,
    },

    /// The campaign needs nothing more.
    Finished,

    /// A duty failed on every attempt and the campaign did not move on.
    Failed {
        /// The failed duty.
        duty: CampaignDuty,
        /// Reason of the last failure.
        reason: String,
    },
}

impl DriverState {
    /// Whether the driver has stopped.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Finished | DriverState::Failed { .. })
    }
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverState::Recovering => write!(f, "recovering"),
            DriverState::Observing { retry: None } => write!(f, "observing"),
            DriverState::Observing { retry: Some(r) } => {
                write!(f, "observing (retry {} after {} attempts)", r.duty, r.attempts)
            }
            DriverState::Executing { duty, attempt } => write!(f, "executing {duty} #{attempt}"),
            DriverState::Confirming { duty, tx_id, .. } => write!(f, "confirming {duty} ({tx_id})"),
            DriverState::Retrying { duty, attempt, .. } => {
                write!(f, "retrying {duty} after attempt {attempt}")
            }
            DriverState::Waiting { duty } => write!(f, "waiting ({duty})"),
            DriverState::Finished => write!(f, "finished"),
            DriverState::Failed { duty, reason } => write!(f, "failed {duty}: {reason}"),
        }
    }
}
