//! The reward fold: pays every node its pro-rata share of the reward pool.
//!
//! A node that has been paid holds the reduced floor instead of the full one. The released
//! folding fee goes to whoever advances the fold, and the same marker tells participants and
//! the phase derivation that rewards have been distributed.

use std::time::Duration;

use campaign_ledger::{
    context::CampaignContext,
    gateway::LedgerGateway,
    queries::{records_with_asset, wallet_balance, Record},
    skeleton::{ledger_position, TxSkeleton},
    submit::{submit_and_confirm, PlannedTx},
};
use campaign_primitives::{
    address::Address,
    datums::{FoldDatum, RewardFoldDatum},
    errors::{CampaignError, CampaignResult},
    hashes::{PubKeyHash, TxId},
    plutus::PlutusData,
    redeemers::{
        FoldMintOp, FoldOp, NodeSpendAct, RewardFoldMintOp, RewardFoldOp, RewardPoolMintOp,
    },
    time::PosixTime,
    utxo::{OutputRef, TxOutput, Utxo},
    value::Value,
};
use campaign_sorted_set::store::{NodeRecord, SetStore};
use tracing::{debug, info};

use crate::{
    batch::{next_batch, nodes_of, validate_batch},
    commit,
};

fn pool_datum(ctx: &CampaignContext) -> PlutusData {
    PlutusData::bytes(ctx.campaign_token().as_bytes())
}

/// Fetches the reward pool record of the campaign, if any.
pub async fn fetch_reward_pool<G>(
    gateway: &G,
    ctx: &CampaignContext,
) -> CampaignResult<Option<Utxo>>
where
    G: LedgerGateway + ?Sized,
{
    let scripts = ctx.scripts();
    let datum = pool_datum(ctx);
    let pools = gateway
        .utxos_with_asset(&scripts.reward_pool_address(), &scripts.reward_pool_token())
        .await?;
    Ok(pools
        .into_iter()
        .find(|u| u.output.datum.as_ref() == Some(&datum)))
}

/// Fetches the reward fold accumulator of the campaign, if any.
pub async fn fetch_accumulator<G>(
    gateway: &G,
    ctx: &CampaignContext,
) -> CampaignResult<Option<Record<RewardFoldDatum>>>
where
    G: LedgerGateway + ?Sized,
{
    let scripts = ctx.scripts();
    let campaign_token = ctx.campaign_token();
    let mut records = records_with_asset::<_, RewardFoldDatum>(
        gateway,
        &scripts.reward_fold_address(),
        &scripts.reward_fold_token(),
    )
    .await?;
    records.retain(|r| r.datum.current_node.campaign_token == campaign_token);
    match records.len() {
        0 | 1 => Ok(records.pop()),
        n => Err(CampaignError::Configuration(format!(
            "{n} reward fold accumulators for one campaign"
        ))),
    }
}

/// Plans the reward pool record holding `amount` reward tokens.
///
/// `available` is the reward balance of the signer's wallet.
pub fn plan_init_reward_pool(
    ctx: &CampaignContext,
    existing: Option<&Utxo>,
    amount: u64,
    available: u64,
    signer: PubKeyHash,
) -> CampaignResult<PlannedTx> {
    if let Some(existing) = existing {
        return Err(CampaignError::DuplicateKey(format!(
            "reward pool already at {}",
            existing.out_ref
        )));
    }
    if amount == 0 {
        return Err(CampaignError::Configuration(
            "reward pool must not be empty".to_string(),
        ));
    }
    if available < amount {
        return Err(CampaignError::InsufficientFunds(format!(
            "{signer} holds {available} of {}, pool needs {amount}",
            ctx.config.reward_asset
        )));
    }

    let token = ctx.scripts().reward_pool_token();
    let mut tx = TxSkeleton::new("init-reward-pool");
    tx.read(&ctx.config_utxo)
        .mint(token.clone(), 1, &RewardPoolMintOp::MintHolder)
        .require_signer(signer);
    tx.pay(
        TxOutput::new(
            ctx.scripts().reward_pool_address(),
            Value::from_lovelace(ctx.protocol().record_floor)
                .with(ctx.config.reward_asset.clone(), amount)
                .with(token, 1),
        )
        .with_datum(&pool_datum(ctx)),
    );
    Ok(PlannedTx::new(tx, signer))
}

/// Inputs of the reward fold creation.
#[derive(Debug, Clone, Copy)]
pub struct RewardFoldInit<'a> {
    /// The closed commit fold.
    pub commit_fold: Option<&'a Record<FoldDatum>>,
    /// The funded reward pool.
    pub reward_pool: Option<&'a Utxo>,
    /// An already existing reward fold.
    pub existing: Option<&'a Record<RewardFoldDatum>>,
}

/// Plans the creation of the reward fold.
///
/// Consumes the closed commit fold and the reward pool, and marks the head with the reduced
/// floor.
pub fn plan_init(
    ctx: &CampaignContext,
    store: &SetStore,
    inputs: RewardFoldInit<'_>,
    owner: PubKeyHash,
    now: PosixTime,
) -> CampaignResult<PlannedTx> {
    if let Some(existing) = inputs.existing {
        return Err(CampaignError::DuplicateKey(format!(
            "reward fold already at {}",
            existing.utxo.out_ref
        )));
    }
    let commit = inputs
        .commit_fold
        .ok_or_else(|| CampaignError::NotFound("commit fold".to_string()))?;
    if !commit.datum.is_closed() {
        return Err(CampaignError::Phase("commit fold is still open".to_string()));
    }
    let pool = inputs
        .reward_pool
        .ok_or_else(|| CampaignError::NotFound("reward pool".to_string()))?;
    let head = store
        .head()
        .ok_or_else(|| CampaignError::NotFound("head node".to_string()))?;
    let window = ctx.validity_window(now);
    if !window.entirely_after(ctx.config.end) {
        return Err(CampaignError::Phase(format!(
            "reward fold starts after {}",
            ctx.config.end
        )));
    }

    let scripts = ctx.scripts();
    let protocol = ctx.protocol();
    let total_reward_tokens = ctx.reward_of(pool.value());
    let token = scripts.reward_fold_token();
    let datum = RewardFoldDatum {
        current_node: head.node.clone(),
        total_reward_tokens,
        total_staked: commit.datum.staked_total,
        owner: Address::from_key(owner),
    };
    let mut marked_head = head.utxo.value().clone();
    marked_head.set_lovelace(protocol.reduced_floor());

    let mut tx = TxSkeleton::new("init-reward-fold");
    tx.spend(&commit.utxo, &FoldOp::Reclaim)
        .spend(pool, &RewardPoolMintOp::BurnHolder)
        .spend(&head.utxo, &NodeSpendAct::RewardFoldAct)
        .read(&ctx.config_utxo)
        .mint(scripts.commit_fold_token(), -1, &FoldMintOp::BurnFold)
        .mint(scripts.reward_pool_token(), -1, &RewardPoolMintOp::BurnHolder)
        .mint(token.clone(), 1, &RewardFoldMintOp::MintRewardFold)
        .valid_in(window)
        .require_signer(owner);
    tx.pay(TxOutput::new(scripts.node_address(), marked_head).with_datum(&head.node));
    tx.pay(
        TxOutput::new(
            scripts.reward_fold_address(),
            Value::from_lovelace(protocol.record_floor)
                .with(ctx.config.reward_asset.clone(), total_reward_tokens)
                .with(token, 1),
        )
        .with_datum(&datum),
    );

    info!(
        total_reward_tokens,
        total_staked = commit.datum.staked_total,
        "planned reward fold creation"
    );
    Ok(PlannedTx::new(tx, owner))
}

/// Plans one advance paying every node of `batch`.
///
/// A single node is authorized by the accumulator's own redeemer; larger batches through a
/// zero withdrawal from the reward fold stake script.
pub fn plan_advance(
    ctx: &CampaignContext,
    acc: &Record<RewardFoldDatum>,
    batch: &[&NodeRecord],
    signer: PubKeyHash,
) -> CampaignResult<PlannedTx> {
    let protocol = ctx.protocol();
    validate_batch(
        &acc.datum.current_node,
        &nodes_of(batch),
        protocol.reward_fold_batch_size,
    )?;
    let Some(last) = batch.last() else {
        return Err(CampaignError::InvalidBatch("empty batch".to_string()));
    };
    let reward_asset = &ctx.config.reward_asset;

    let mut tx = TxSkeleton::new("advance-reward-fold");
    tx.read(&ctx.config_utxo);
    let mut out_indices = Vec::with_capacity(batch.len());
    let mut paid: u64 = 0;
    for record in batch {
        if record.is_marked(protocol) {
            return Err(CampaignError::InvalidBatch(format!(
                "node {:?} was already paid",
                record.key()
            )));
        }
        let owed = acc.datum.owed(ctx.stake_of(record.utxo.value()));
        paid = paid
            .checked_add(owed)
            .ok_or_else(|| CampaignError::InvalidBatch("reward total overflows".to_string()))?;

        let mut value = record.utxo.value().clone();
        value.set_lovelace(protocol.reduced_floor());
        value.add(reward_asset.clone(), owed);
        tx.spend(&record.utxo, &NodeSpendAct::RewardFoldAct);
        out_indices.push(tx.pay(
            TxOutput::new(ctx.scripts().node_address(), value).with_datum(&record.node),
        ));
    }

    let mut remaining = acc.utxo.value().clone();
    remaining.remove(reward_asset, paid).ok_or_else(|| {
        CampaignError::InvalidBatch(format!("accumulator cannot pay {paid} more"))
    })?;
    let datum = RewardFoldDatum {
        current_node: last.node.clone(),
        ..acc.datum.clone()
    };

    let all_inputs: Vec<OutputRef> = batch
        .iter()
        .map(|r| r.utxo.out_ref)
        .chain([acc.utxo.out_ref])
        .collect();
    let in_indices = batch
        .iter()
        .map(|r| {
            ledger_position(all_inputs.iter(), &r.utxo.out_ref).ok_or_else(|| {
                CampaignError::InvalidBatch(format!("{} not spent", r.utxo.out_ref))
            })
        })
        .collect::<CampaignResult<Vec<_>>>()?;
    let op = RewardFoldOp::FoldNodes {
        in_indices,
        out_indices,
    };
    if batch.len() == 1 {
        tx.spend(&acc.utxo, &op);
    } else {
        tx.spend(&acc.utxo, &PlutusData::unit())
            .withdraw(ctx.scripts().reward_fold_stake_credential(), 0, &op);
    }
    tx.pay(TxOutput::new(ctx.scripts().reward_fold_address(), remaining).with_datum(&datum));

    debug!(nodes = batch.len(), paid, "planned reward fold advance");
    Ok(PlannedTx::new(tx, signer))
}

/// Plans the destruction of a closed reward fold, sending the leftover reward to `reclaim_to`.
pub fn plan_reclaim(
    ctx: &CampaignContext,
    acc: &Record<RewardFoldDatum>,
    reclaim_to: &Address,
    signer: PubKeyHash,
) -> CampaignResult<PlannedTx> {
    if !acc.datum.is_closed() {
        return Err(CampaignError::Phase("reward fold is still open".to_string()));
    }
    if acc.datum.owner.payment_key_hash() != Some(signer) {
        return Err(CampaignError::Configuration(format!(
            "{signer} does not own the reward fold"
        )));
    }

    let dust = ctx.reward_of(acc.utxo.value());
    let mut tx = TxSkeleton::new("reclaim-reward");
    tx.spend(&acc.utxo, &RewardFoldOp::Reclaim)
        .mint(
            ctx.scripts().reward_fold_token(),
            -1,
            &RewardFoldMintOp::BurnRewardFold,
        )
        .require_signer(signer);
    if dust > 0 {
        tx.pay(TxOutput::new(
            reclaim_to.clone(),
            Value::zero().with(ctx.config.reward_asset.clone(), dust),
        ));
    }
    info!(dust, to = %reclaim_to, "planned reward reclaim");
    Ok(PlannedTx::new(tx, signer))
}

/// Drives the reward pool and reward fold of one campaign on behalf of `operator`.
#[derive(Debug, Clone)]
pub struct RewardFold<G> {
    gateway: G,
    ctx: CampaignContext,
    operator: PubKeyHash,
    batch_size: usize,
    confirmation_timeout: Duration,
}

impl<G: LedgerGateway> RewardFold<G> {
    /// Creates the engine, batching as the protocol parameters say.
    pub fn new(gateway: G, ctx: CampaignContext, operator: PubKeyHash) -> Self {
        let batch_size = ctx.protocol().reward_fold_batch_size;
        Self {
            gateway,
            ctx,
            operator,
            batch_size,
            confirmation_timeout: Duration::from_secs(120),
        }
    }

    /// Uses batches of at most `size` nodes, capped by the protocol limit.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.clamp(1, self.ctx.protocol().reward_fold_batch_size);
        self
    }

    /// Overrides how long to wait for each transaction.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// The current reward pool record.
    pub async fn reward_pool(&self) -> CampaignResult<Option<Utxo>> {
        fetch_reward_pool(&self.gateway, &self.ctx).await
    }

    /// The current accumulator.
    pub async fn accumulator(&self) -> CampaignResult<Option<Record<RewardFoldDatum>>> {
        fetch_accumulator(&self.gateway, &self.ctx).await
    }

    async fn execute(&self, planned: PlannedTx) -> CampaignResult<TxId> {
        submit_and_confirm(&self.gateway, &planned, self.confirmation_timeout).await
    }

    /// Plans locking `amount` reward tokens from the operator's wallet in the reward pool.
    pub async fn prepare_init_reward_pool(&self, amount: u64) -> CampaignResult<PlannedTx> {
        let existing = self.reward_pool().await?;
        let available =
            wallet_balance(&self.gateway, &self.operator, &self.ctx.config.reward_asset).await?;
        plan_init_reward_pool(
            &self.ctx,
            existing.as_ref(),
            amount,
            available,
            self.operator,
        )
    }

    /// Plans the creation of the accumulator from the closed commit fold and the reward pool.
    pub async fn prepare_init(&self) -> CampaignResult<PlannedTx> {
        let now = self.gateway.current_time().await?;
        let store = SetStore::fetch(&self.gateway, &self.ctx).await?;
        let commit_fold = commit::fetch_accumulator(&self.gateway, &self.ctx).await?;
        let reward_pool = self.reward_pool().await?;
        let existing = self.accumulator().await?;
        let inputs = RewardFoldInit {
            commit_fold: commit_fold.as_ref(),
            reward_pool: reward_pool.as_ref(),
            existing: existing.as_ref(),
        };
        plan_init(&self.ctx, &store, inputs, self.operator, now)
    }

    /// Plans paying the next batch, starting from wherever the accumulator points now.
    pub async fn prepare_advance(&self) -> CampaignResult<PlannedTx> {
        let acc = self
            .accumulator()
            .await?
            .ok_or_else(|| CampaignError::NotFound("reward fold".to_string()))?;
        let store = SetStore::fetch(&self.gateway, &self.ctx).await?;
        let batch = next_batch(&store, &acc.datum.current_node, self.batch_size)?;
        plan_advance(&self.ctx, &acc, &batch, self.operator)
    }

    /// Plans the destruction of the closed accumulator.
    pub async fn prepare_reclaim(&self, reclaim_to: &Address) -> CampaignResult<PlannedTx> {
        let acc = self
            .accumulator()
            .await?
            .ok_or_else(|| CampaignError::NotFound("reward fold".to_string()))?;
        plan_reclaim(&self.ctx, &acc, reclaim_to, self.operator)
    }

    /// Locks `amount` reward tokens from the operator's wallet in the reward pool.
    pub async fn init_reward_pool(&self, amount: u64) -> CampaignResult<TxId> {
        self.execute(self.prepare_init_reward_pool(amount).await?)
            .await
    }

    /// Creates the accumulator.
    pub async fn init(&self) -> CampaignResult<TxId> {
        self.execute(self.prepare_init().await?).await
    }

    /// Pays the next batch.
    pub async fn advance(&self) -> CampaignResult<TxId> {
        self.execute(self.prepare_advance().await?).await
    }

    /// Destroys the closed accumulator, sending the leftover reward to `reclaim_to`.
    pub async fn reclaim(&self, reclaim_to: &Address) -> CampaignResult<TxId> {
        self.execute(self.prepare_reclaim(reclaim_to).await?)
            .await
    }

    /// Advances until the accumulator is closed and returns its final state.
    pub async fn fold_all(&self) -> CampaignResult<RewardFoldDatum> {
        loop {
            let acc = self
                .accumulator()
                .await?
                .ok_or_else(|| CampaignError::NotFound("reward fold".to_string()))?;
            if acc.datum.is_closed() {
                info!(
                    dust = self.ctx.reward_of(acc.utxo.value()),
                    "reward fold closed"
                );
                return Ok(acc.datum);
            }
            self.advance().await?;
        }
    }
}
