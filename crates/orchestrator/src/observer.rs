//! Reading the campaign's records into a [`CampaignSnapshot`].

use campaign_fold::{commit, reward};
use campaign_ledger::{context::CampaignContext, gateway::LedgerGateway};
use campaign_primitives::errors::CampaignResult;
use campaign_sm::phase::{CampaignSnapshot, FoldView, HeadView};
use campaign_sorted_set::store::SetStore;
use tracing::debug;

/// Takes a snapshot of the campaign.
///
/// The records are read one query at a time, so a transaction landing in between can make the
/// snapshot inconsistent; the next observation sees the settled state.
pub async fn observe<G>(gateway: &G, ctx: &CampaignContext) -> CampaignResult<CampaignSnapshot>
where
    G: LedgerGateway + ?Sized,
{
    let now = gateway.current_time().await?;
    let store = SetStore::fetch(gateway, ctx).await?;
    let head = store.head().map(|head| HeadView {
        marked: head.is_marked(ctx.protocol()),
    });

    let commit_fold = commit::fetch_accumulator(gateway, ctx)
        .await?
        .map(|acc| FoldView {
            current: acc.datum.current_node.key,
            closed: acc.datum.is_closed(),
        });
    let reward_fold = reward::fetch_accumulator(gateway, ctx)
        .await?
        .map(|acc| FoldView {
            current: acc.datum.current_node.key,
            closed: acc.datum.is_closed(),
        });
    let reward_pool = reward::fetch_reward_pool(gateway, ctx).await?.is_some();

    let snapshot = CampaignSnapshot {
        now,
        freeze: ctx.config.freeze,
        end: ctx.config.end,
        head,
        commit_fold,
        reward_fold,
        reward_pool,
    };
    debug!(nodes = store.len(), ?snapshot, "observed campaign");
    Ok(snapshot)
}
