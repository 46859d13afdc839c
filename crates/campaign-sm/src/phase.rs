//! Derivation of the campaign phase from a snapshot of its records.
//!
//! The phase is never stored. It is recomputed from what the ledger shows at a given instant, so
//! a snapshot taken while a transaction is in flight may briefly disagree with the next one.
//! Some terminal situations cannot be told apart with certainty either: a missing head after the
//! end may mean the campaign never started or that it was wound down, and both are reported as
//! [`CampaignPhase::UserClaimsAllowed`].

use std::fmt;

use campaign_primitives::{hashes::PubKeyHash, time::PosixTime};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignPhase {
    /// Staking is open in time but the head of the set does not exist yet.
    StakingNotStarted,
    /// Participants may stake, modify and withdraw without penalty.
    StakingOpen,
    /// Stakes are frozen; withdrawals pay a penalty.
    StakeFrozen,
    /// Staking is over and nobody has started counting.
    StakingEnded,
    /// The commit fold is counting stakes.
    StakeCalculationStarted,
    /// The commit fold has counted every stake.
    StakeCalculationEnded,
    /// The reward fold is paying nodes.
    RewardsProcessingStarted,
    /// Participants may claim their stake and reward.
    UserClaimsAllowed,
}

impl fmt::Display for CampaignPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CampaignPhase::StakingNotStarted => "staking-not-started",
            CampaignPhase::StakingOpen => "staking-open",
            CampaignPhase::StakeFrozen => "stake-frozen",
            CampaignPhase::StakingEnded => "staking-ended",
            CampaignPhase::StakeCalculationStarted => "stake-calculation-started",
            CampaignPhase::StakeCalculationEnded => "stake-calculation-ended",
            CampaignPhase::RewardsProcessingStarted => "rewards-processing-started",
            CampaignPhase::UserClaimsAllowed => "user-claims-allowed",
        };
        f.write_str(name)
    }
}

/// What the snapshot saw of the head sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadView {
    /// Whether the head holds the reduced floor, i.e. a reward fold was created.
    pub marked: bool,
}

/// What the snapshot saw of a fold accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldView {
    /// Key of the node the accumulator points at, `None` for the head.
    pub current: Option<PubKeyHash>,
    /// Whether the pointed node is the tail.
    pub closed: bool,
}

/// Everything the phase and the next duty depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    /// Ledger time at which the records were read.
    pub now: PosixTime,
    /// Freeze timestamp of the campaign.
    pub freeze: PosixTime,
    /// End timestamp of the campaign.
    pub end: PosixTime,
    /// The head sentinel, if present.
    pub head: Option<HeadView>,
    /// The commit fold accumulator, if present.
    pub commit_fold: Option<FoldView>,
    /// The reward fold accumulator, if present.
    pub reward_fold: Option<FoldView>,
    /// Whether a funded reward pool exists.
    pub reward_pool: bool,
}

/// Derives the phase of the campaign.
pub fn derive_phase(snapshot: &CampaignSnapshot) -> CampaignPhase {
    if snapshot.now < snapshot.freeze {
        return match snapshot.head {
            Some(_) => CampaignPhase::StakingOpen,
            None => CampaignPhase::StakingNotStarted,
        };
    }
    if snapshot.now < snapshot.end {
        return CampaignPhase::StakeFrozen;
    }

    if let Some(reward_fold) = snapshot.reward_fold {
        return if reward_fold.closed {
            CampaignPhase::UserClaimsAllowed
        } else {
            CampaignPhase::RewardsProcessingStarted
        };
    }

    let Some(head) = snapshot.head else {
        return CampaignPhase::UserClaimsAllowed;
    };
    if head.marked {
        return CampaignPhase::UserClaimsAllowed;
    }

    match snapshot.commit_fold {
        Some(fold) if fold.closed => CampaignPhase::StakeCalculationEnded,
        Some(_) => CampaignPhase::StakeCalculationStarted,
        None => CampaignPhase::StakingEnded,
    }
}
