//! What the driver asks its caller to do.

use std::{fmt, time::Duration};

use campaign_primitives::{duties::CampaignDuty, hashes::TxId};
use serde::{Deserialize, Serialize};

/// An action for the driver's caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverDuty {
    /// Take a fresh snapshot and plan the next campaign duty.
    Observe,

    /// Journal, build and submit the transaction of `duty`.
    Dispatch {
        /// The campaign duty to carry out.
        duty: CampaignDuty,
        /// 1-based attempt number.
        attempt: u32,
    },

    /// Wait for a submitted transaction to be included.
    AwaitConfirmation {
        /// The duty the transaction carries out.
        duty: CampaignDuty,
        /// The submitted transaction.
        tx_id: TxId,
    },

    /// Pause before the next event.
    Sleep(Duration),
}

impl fmt::Display for DriverDuty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverDuty::Observe => write!(f, "observe"),
            DriverDuty::Dispatch { duty, attempt } => write!(f, "dispatch {duty} #{attempt}"),
            DriverDuty::AwaitConfirmation { duty, tx_id } => {
                write!(f, "await {tx_id} for {duty}")
            }
            DriverDuty::Sleep(d) => write!(f, "sleep {}ms", d.as_millis()),
        }
    }
}
