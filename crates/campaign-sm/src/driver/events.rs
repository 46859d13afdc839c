//! What the driver's caller reports back.

use std::fmt;

use campaign_primitives::{duties::CampaignDuty, hashes::TxId, time::PosixTime};
use serde::{Deserialize, Serialize};

/// Outcome of reading the journal at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recovery {
    /// Nothing was in flight.
    Clean,

    /// A journaled transaction already settled (its inputs are gone).
    Settled,

    /// A journaled transaction was submitted and its inputs are still unspent.
    InFlight {
        /// The duty it carries out.
        duty: CampaignDuty,
        /// Attempt number it was submitted under.
        attempt: u32,
        /// The submitted transaction.
        tx_id: TxId,
    },

    /// A duty was journaled but never made it to the ledger.
    Abandoned {
        /// The interrupted duty.
        duty: CampaignDuty,
        /// Attempt number it was interrupted at.
        attempt: u32,
    },
}

/// Input of the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverEvent {
    /// The journal was read.
    Recovered(Recovery),

    /// A snapshot was taken and planned.
    Observed {
        /// Ledger time of the snapshot.
        now: PosixTime,
        /// The planned duty.
        duty: CampaignDuty,
    },

    /// The dispatched transaction was accepted by the gateway.
    Submitted {
        /// Its id.
        tx_id: TxId,
    },

    /// Dispatching or confirming failed.
    Failed {
        /// Whether trying again may help.
        recoverable: bool,
        /// What went wrong.
        reason: String,
    },

    /// The awaited transaction was included.
    Confirmed,

    /// The awaited transaction was not included in time.
    ConfirmationTimedOut,

    /// A requested sleep is over.
    Elapsed,
}

impl fmt::Display for DriverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverEvent::Recovered(recovery) => write!(f, "recovered({recovery:?})"),
            DriverEvent::Observed { now, duty } => write!(f, "observed({duty} at {now})"),
            DriverEvent::Submitted { tx_id } => write!(f, "submitted({tx_id})"),
            DriverEvent::Failed { reason, .. } => write!(f, "failed({reason})"),
            DriverEvent::Confirmed => write!(f, "confirmed"),
            DriverEvent::ConfirmationTimedOut => write!(f, "confirmation-timed-out"),
            DriverEvent::Elapsed => write!(f, "elapsed"),
        }
    }
}
