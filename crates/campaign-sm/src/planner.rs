//! Choosing the next duty for a snapshot.

use std::time::Duration;

use campaign_primitives::duties::CampaignDuty;
use serde::{Deserialize, Serialize};

use crate::phase::{derive_phase, CampaignPhase, CampaignSnapshot};

/// Which optional duties the orchestrator is allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlannerOptions {
    /// Create the head of the set when it is missing.
    pub create_head: bool,

    /// Fund the reward pool once stakes are counted.
    pub fund_reward_pool: bool,

    /// Destroy the head once the reward fold is gone.
    pub destroy_head: bool,

    /// How long after the end folds may start; the validity tolerance of the protocol.
    pub settle_margin: Duration,
}

/// Maps the snapshot to the single duty that moves the campaign forward.
pub fn plan(snapshot: &CampaignSnapshot, opts: &PlannerOptions) -> CampaignDuty {
    plan_for_phase(derive_phase(snapshot), snapshot, opts)
}

/// Like [`plan`] for an already derived phase.
pub fn plan_for_phase(
    phase: CampaignPhase,
    snapshot: &CampaignSnapshot,
    opts: &PlannerOptions,
) -> CampaignDuty {
    let folds_open_at = snapshot.end.saturating_add(opts.settle_margin);
    match phase {
        CampaignPhase::StakingNotStarted if opts.create_head => CampaignDuty::InitSet,
        CampaignPhase::StakingNotStarted => CampaignDuty::WaitUntil(snapshot.freeze),
        CampaignPhase::StakingOpen | CampaignPhase::StakeFrozen => {
            CampaignDuty::WaitUntil(folds_open_at)
        }
        CampaignPhase::StakingEnded if snapshot.now < folds_open_at => {
            CampaignDuty::WaitUntil(folds_open_at)
        }
        CampaignPhase::StakingEnded => CampaignDuty::InitCommitFold,
        CampaignPhase::StakeCalculationStarted => CampaignDuty::AdvanceCommitFold {
            from: snapshot.commit_fold.and_then(|fold| fold.current),
        },
        CampaignPhase::StakeCalculationEnded if snapshot.reward_pool => {
            CampaignDuty::InitRewardFold
        }
        CampaignPhase::StakeCalculationEnded if opts.fund_reward_pool => {
            CampaignDuty::InitRewardPool
        }
        CampaignPhase::StakeCalculationEnded => CampaignDuty::WaitForRewardPool,
        CampaignPhase::RewardsProcessingStarted => CampaignDuty::AdvanceRewardFold {
            from: snapshot.reward_fold.and_then(|fold| fold.current),
        },
        CampaignPhase::UserClaimsAllowed => {
            if snapshot.reward_fold.is_some() {
                CampaignDuty::ReclaimReward
            } else if opts.destroy_head && snapshot.head.is_some_and(|head| head.marked) {
                CampaignDuty::DeinitSet
            } else {
                CampaignDuty::Done
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use campaign_primitives::{hashes::PubKeyHash, time::PosixTime};

    use super::*;
    use crate::phase::{FoldView, HeadView};

    const MARGIN: Duration = Duration::from_secs(1);

    fn snapshot(now: u64) -> CampaignSnapshot {
        CampaignSnapshot {
            now: PosixTime(now),
            freeze: PosixTime(10_000),
            end: PosixTime(20_000),
            head: Some(HeadView { marked: false }),
            commit_fold: None,
            reward_fold: None,
            reward_pool: false,
        }
    }

    fn all_enabled() -> PlannerOptions {
        PlannerOptions {
            create_head: true,
            fund_reward_pool: true,
            destroy_head: true,
            settle_margin: MARGIN,
        }
    }

    #[test]
    fn test_head_creation_is_opt_in() {
        let mut s = snapshot(0);
        s.head = None;
        assert_eq!(plan(&s, &all_enabled()), CampaignDuty::InitSet);
        let passive = PlannerOptions {
            settle_margin: MARGIN,
            ..Default::default()
        };
        assert_eq!(plan(&s, &passive), CampaignDuty::WaitUntil(PosixTime(10_000)));
    }

    #[test]
    fn test_commit_fold_waits_for_the_margin() {
        let opts = all_enabled();
        assert_eq!(
            plan(&snapshot(5_000), &opts),
            CampaignDuty::WaitUntil(PosixTime(21_000))
        );
        assert_eq!(
            plan(&snapshot(20_500), &opts),
            CampaignDuty::WaitUntil(PosixTime(21_000))
        );
        assert_eq!(plan(&snapshot(21_000), &opts), CampaignDuty::InitCommitFold);
    }

    #[test]
    fn test_fold_advances_carry_their_pointer() {
        let key = PubKeyHash::new([4; 28]);
        let mut s = snapshot(30_000);
        s.commit_fold = Some(FoldView {
            current: Some(key),
            closed: false,
        });
        assert_eq!(
            plan(&s, &all_enabled()),
            CampaignDuty::AdvanceCommitFold { from: Some(key) }
        );

        s.commit_fold = None;
        s.head = Some(HeadView { marked: true });
        s.reward_fold = Some(FoldView {
            current: None,
            closed: false,
        });
        assert_eq!(
            plan(&s, &all_enabled()),
            CampaignDuty::AdvanceRewardFold { from: None }
        );
    }

    #[test]
    fn test_reward_pool_gates_the_reward_fold() {
        let mut s = snapshot(30_000);
        s.commit_fold = Some(FoldView {
            current: Some(PubKeyHash::new([4; 28])),
            closed: true,
        });
        assert_eq!(plan(&s, &all_enabled()), CampaignDuty::InitRewardPool);
        let no_funding = PlannerOptions {
            fund_reward_pool: false,
            ..all_enabled()
        };
        assert_eq!(plan(&s, &no_funding), CampaignDuty::WaitForRewardPool);
        s.reward_pool = true;
        assert_eq!(plan(&s, &no_funding), CampaignDuty::InitRewardFold);
    }

    #[test]
    fn test_wind_down() {
        let mut s = snapshot(30_000);
        s.head = Some(HeadView { marked: true });
        s.reward_fold = Some(FoldView {
            current: Some(PubKeyHash::new([4; 28])),
            closed: true,
        });
        assert_eq!(plan(&s, &all_enabled()), CampaignDuty::ReclaimReward);

        s.reward_fold = None;
        assert_eq!(plan(&s, &all_enabled()), CampaignDuty::DeinitSet);
        let keep_head = PlannerOptions {
            destroy_head: false,
            ..all_enabled()
        };
        assert_eq!(plan(&s, &keep_head), CampaignDuty::Done);

        s.head = None;
        assert_eq!(plan(&s, &all_enabled()), CampaignDuty::Done);
    }
}
