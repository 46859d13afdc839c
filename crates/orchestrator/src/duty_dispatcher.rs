//! Turning a planned [`CampaignDuty`] into a transaction.

use campaign_fold::{commit::CommitFold, reward::RewardFold};
use campaign_ledger::{context::CampaignContext, gateway::LedgerGateway, submit::PlannedTx};
use campaign_primitives::{
    address::Address,
    duties::CampaignDuty,
    errors::{CampaignError, CampaignResult},
    hashes::PubKeyHash,
};
use campaign_sorted_set::mutator::SetMutator;
use tracing::debug;

use crate::config::OrchestratorConfig;

/// Builds the transaction of each duty from a fresh view of the ledger.
///
/// Only plans are produced here; submission and confirmation belong to the pipeline so that the
/// journal can be written in between.
#[derive(Debug, Clone)]
pub struct DutyDispatcher<G> {
    set: SetMutator<G>,
    commit_fold: CommitFold<G>,
    reward_fold: RewardFold<G>,
    operator: PubKeyHash,
    reward_pool_amount: Option<u64>,
    reclaim_to: Address,
}

impl<G: LedgerGateway + Clone> DutyDispatcher<G> {
    /// Creates the dispatcher of the campaign described by `ctx`.
    pub fn new(gateway: G, ctx: CampaignContext, config: &OrchestratorConfig) -> Self {
        Self {
            set: SetMutator::new(gateway.clone(), ctx.clone()),
            commit_fold: CommitFold::new(gateway.clone(), ctx.clone(), config.operator),
            reward_fold: RewardFold::new(gateway, ctx, config.operator),
            operator: config.operator,
            reward_pool_amount: config.reward_pool_amount,
            reclaim_to: config.reclaim_to(),
        }
    }

    /// Plans the transaction carrying out `duty`.
    ///
    /// Advances are only planned while the accumulator still points where the duty was planned
    /// from; a moved pointer means another operator advanced it and the duty is stale.
    pub async fn prepare(&self, duty: &CampaignDuty) -> CampaignResult<PlannedTx> {
        debug!(%duty, "preparing duty");
        match duty {
            CampaignDuty::InitSet => self.set.prepare_init_set(self.operator).await,
            CampaignDuty::InitCommitFold => self.commit_fold.prepare_init().await,
            CampaignDuty::AdvanceCommitFold { from } => {
                let current = self
                    .commit_fold
                    .accumulator()
                    .await?
                    .map(|acc| acc.datum.current_node.key);
                ensure_pointer(duty, *from, current)?;
                self.commit_fold.prepare_advance().await
            }
            CampaignDuty::InitRewardPool => {
                let amount = self.reward_pool_amount.ok_or_else(|| {
                    CampaignError::Configuration("no reward pool amount configured".to_string())
                })?;
                self.reward_fold.prepare_init_reward_pool(amount).await
            }
            CampaignDuty::InitRewardFold => self.reward_fold.prepare_init().await,
            CampaignDuty::AdvanceRewardFold { from } => {
                let current = self
                    .reward_fold
                    .accumulator()
                    .await?
                    .map(|acc| acc.datum.current_node.key);
                ensure_pointer(duty, *from, current)?;
                self.reward_fold.prepare_advance().await
            }
            CampaignDuty::ReclaimReward => self.reward_fold.prepare_reclaim(&self.reclaim_to).await,
            CampaignDuty::DeinitSet => self.set.prepare_deinit(self.operator).await,
            CampaignDuty::WaitUntil(_) | CampaignDuty::WaitForRewardPool | CampaignDuty::Done => {
                Err(CampaignError::Phase(format!("{duty} submits no transaction")))
            }
        }
    }
}

fn ensure_pointer(
    duty: &CampaignDuty,
    planned: Option<PubKeyHash>,
    current: Option<Option<PubKeyHash>>,
) -> CampaignResult<()> {
    match current {
        None => Err(CampaignError::NotFound(format!("accumulator for {duty}"))),
        Some(current) if current != planned => Err(CampaignError::Phase(format!(
            "{duty} is stale: accumulator moved to {}",
            current.map_or_else(|| "the head".to_string(), |key| key.to_string())
        ))),
        Some(_) => Ok(()),
    }
}
