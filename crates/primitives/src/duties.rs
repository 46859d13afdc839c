//! The units of work the campaign orchestrator performs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{hashes::PubKeyHash, time::PosixTime};

/// One step of the campaign lifecycle, as planned from a snapshot of the ledger.
///
/// Fold advances carry the key the accumulator currently points at, so that two plans made
/// before and after a successful advance never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CampaignDuty {
    /// Create the head sentinel of the set.
    InitSet,

    /// Nothing to do before the given instant.
    WaitUntil(PosixTime),

    /// Create the commit fold accumulator.
    InitCommitFold,

    /// Absorb the next batch of nodes into the commit fold.
    AdvanceCommitFold {
        /// Key of the node the accumulator points at (`None` for the head).
        from: Option<PubKeyHash>,
    },

    /// Fund the reward pool record.
    InitRewardPool,

    /// The commit fold is closed but nobody has funded the reward pool yet.
    WaitForRewardPool,

    /// Create the reward fold accumulator from the closed commit fold and the pool.
    InitRewardFold,

    /// Pay the next batch of nodes.
    AdvanceRewardFold {
        /// Key of the node the accumulator points at (`None` for the head).
        from: Option<PubKeyHash>,
    },

    /// Withdraw the undistributed dust of the closed reward fold.
    ReclaimReward,

    /// Destroy the head sentinel.
    DeinitSet,

    /// The campaign needs nothing more from the orchestrator.
    Done,
}

impl CampaignDuty {
    /// Whether the duty submits a transaction.
    pub const fn submits_tx(&self) -> bool {
        !matches!(
            self,
            CampaignDuty::WaitUntil(_) | CampaignDuty::WaitForRewardPool | CampaignDuty::Done
        )
    }
}

impl fmt::Display for CampaignDuty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pointer = |from: &Option<PubKeyHash>| match from {
            Some(key) => key.to_string(),
            None => "head".to_string(),
        };
        match self {
            CampaignDuty::InitSet => write!(f, "init-set"),
            CampaignDuty::WaitUntil(t) => write!(f, "wait-until({t})"),
            CampaignDuty::InitCommitFold => write!(f, "init-commit-fold"),
            CampaignDuty::AdvanceCommitFold { from } => {
                write!(f, "advance-commit-fold(from {})", pointer(from))
            }
            CampaignDuty::InitRewardPool => write!(f, "init-reward-pool"),
            CampaignDuty::WaitForRewardPool => write!(f, "wait-for-reward-pool"),
            CampaignDuty::InitRewardFold => write!(f, "init-reward-fold"),
            CampaignDuty::AdvanceRewardFold { from } => {
                write!(f, "advance-reward-fold(from {})", pointer(from))
            }
            CampaignDuty::ReclaimReward => write!(f, "reclaim-reward"),
            CampaignDuty::DeinitSet => write!(f, "deinit-set"),
            CampaignDuty::Done => write!(f, "done"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duty_json_form() {
        let duty = CampaignDuty::AdvanceCommitFold {
            from: Some(PubKeyHash::new([1; 28])),
        };
        let json = serde_json::to_string(&duty).unwrap();
        assert!(json.starts_with(r#"{"type":"AdvanceCommitFold""#));
        assert_eq!(serde_json::from_str::<CampaignDuty>(&json).unwrap(), duty);
    }

    #[test]
    fn test_waiting_duties_do_not_submit() {
        assert!(!CampaignDuty::WaitUntil(PosixTime(1)).submits_tx());
        assert!(!CampaignDuty::Done.submits_tx());
        assert!(CampaignDuty::InitSet.submits_tx());
    }
}
