//! The commit fold: sums every stake once staking has ended.

use std::time::Duration;

use campaign_ledger::{
    context::CampaignContext,
    gateway::LedgerGateway,
    queries::{records_with_asset, Record},
    skeleton::TxSkeleton,
    submit::{submit_and_confirm, PlannedTx},
};
use campaign_primitives::{
    address::Address,
    datums::FoldDatum,
    errors::{CampaignError, CampaignResult},
    hashes::{PubKeyHash, TxId},
    redeemers::{FoldMintOp, FoldOp},
    time::PosixTime,
    utxo::TxOutput,
    value::Value,
};
use campaign_sorted_set::store::{NodeRecord, SetStore};
use tracing::{debug, info};

use crate::batch::{next_batch, nodes_of, validate_batch};

/// Fetches the commit fold accumulator of the campaign, if any.
pub async fn fetch_accumulator<G>(
    gateway: &G,
    ctx: &CampaignContext,
) -> CampaignResult<Option<Record<FoldDatum>>>
where
    G: LedgerGateway + ?Sized,
{
    let scripts = ctx.scripts();
    let campaign_token = ctx.campaign_token();
    let mut records = records_with_asset::<_, FoldDatum>(
        gateway,
        &scripts.commit_fold_address(),
        &scripts.commit_fold_token(),
    )
    .await?;
    records.retain(|r| r.datum.current_node.campaign_token == campaign_token);
    match records.len() {
        0 | 1 => Ok(records.pop()),
        n => Err(CampaignError::Configuration(format!(
            "{n} commit fold accumulators for one campaign"
        ))),
    }
}

/// Plans the creation of the accumulator, pointing at the head with nothing summed.
pub fn plan_init(
    ctx: &CampaignContext,
    store: &SetStore,
    existing: Option<&Record<FoldDatum>>,
    owner: PubKeyHash,
    now: PosixTime,
) -> CampaignResult<PlannedTx> {
    let window = ctx.validity_window(now);
    if !window.entirely_after(ctx.config.end) {
        return Err(CampaignError::Phase(format!(
            "commit fold starts after {}",
            ctx.config.end
        )));
    }
    if let Some(existing) = existing {
        return Err(CampaignError::DuplicateKey(format!(
            "commit fold already at {}",
            existing.utxo.out_ref
        )));
    }
    let head = store
        .head()
        .ok_or_else(|| CampaignError::NotFound("head node".to_string()))?;

    let token = ctx.scripts().commit_fold_token();
    let datum = FoldDatum {
        current_node: head.node.clone(),
        staked_total: 0,
        owner: Address::from_key(owner),
    };

    let mut tx = TxSkeleton::new("init-commit-fold");
    tx.read(&head.utxo)
        .read(&ctx.config_utxo)
        .mint(token.clone(), 1, &FoldMintOp::MintFold)
        .valid_in(window)
        .require_signer(owner);
    tx.pay(
        TxOutput::new(
            ctx.scripts().commit_fold_address(),
            Value::from_lovelace(ctx.protocol().record_floor).with(token, 1),
        )
        .with_datum(&datum),
    );
    Ok(PlannedTx::new(tx, owner))
}

/// Plans one advance absorbing `batch`, read as reference inputs.
pub fn plan_advance(
    ctx: &CampaignContext,
    acc: &Record<FoldDatum>,
    batch: &[&NodeRecord],
    signer: PubKeyHash,
) -> CampaignResult<PlannedTx> {
    validate_batch(
        &acc.datum.current_node,
        &nodes_of(batch),
        ctx.protocol().commit_fold_batch_size,
    )?;

    let mut staked_total = acc.datum.staked_total;
    for record in batch {
        staked_total = staked_total
            .checked_add(record.amount_of(&ctx.config.stake_asset))
            .ok_or_else(|| CampaignError::InvalidBatch("staked total overflows".to_string()))?;
    }
    let Some(last) = batch.last() else {
        return Err(CampaignError::InvalidBatch("empty batch".to_string()));
    };
    let datum = FoldDatum {
        current_node: last.node.clone(),
        staked_total,
        owner: acc.datum.owner.clone(),
    };

    let mut tx = TxSkeleton::new("advance-commit-fold");
    tx.read(&ctx.config_utxo);
    for record in batch {
        tx.read(&record.utxo);
    }
    let indices = batch
        .iter()
        .map(|r| {
            tx.reference_index(&r.utxo.out_ref).ok_or_else(|| {
                CampaignError::InvalidBatch(format!("{} not read", r.utxo.out_ref))
            })
        })
        .collect::<CampaignResult<Vec<_>>>()?;
    tx.spend(&acc.utxo, &FoldOp::FoldNodes { indices });
    tx.pay(
        TxOutput::new(
            ctx.scripts().commit_fold_address(),
            acc.utxo.value().clone(),
        )
        .with_datum(&datum),
    );

    debug!(
        nodes = batch.len(),
        from = acc.datum.staked_total,
        to = staked_total,
        "planned commit fold advance"
    );
    Ok(PlannedTx::new(tx, signer))
}

/// Plans the destruction of an accumulator that has not advanced yet.
pub fn plan_reclaim(
    ctx: &CampaignContext,
    acc: &Record<FoldDatum>,
    signer: PubKeyHash,
) -> CampaignResult<PlannedTx> {
    if !acc.datum.current_node.is_head() {
        return Err(CampaignError::Phase(
            "commit fold already advanced past the head".to_string(),
        ));
    }
    if acc.datum.owner.payment_key_hash() != Some(signer) {
        return Err(CampaignError::Configuration(format!(
            "{signer} does not own the commit fold"
        )));
    }

    let mut tx = TxSkeleton::new("reclaim-commit-fold");
    tx.spend(&acc.utxo, &FoldOp::Reclaim)
        .mint(ctx.scripts().commit_fold_token(), -1, &FoldMintOp::BurnFold)
        .require_signer(signer);
    Ok(PlannedTx::new(tx, signer))
}

/// Drives the commit fold of one campaign on behalf of `operator`.
#[derive(Debug, Clone)]
pub struct CommitFold<G> {
    gateway: G,
    ctx: CampaignContext,
    operator: PubKeyHash,
    batch_size: usize,
    confirmation_timeout: Duration,
}

impl<G: LedgerGateway> CommitFold<G> {
    /// Creates the engine, batching as the protocol parameters say.
    pub fn new(gateway: G, ctx: CampaignContext, operator: PubKeyHash) -> Self {
        let batch_size = ctx.protocol().commit_fold_batch_size;
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
        self.batch_size = size.clamp(1, self.ctx.protocol().commit_fold_batch_size);
        self
    }

    /// Overrides how long to wait for each transaction.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// The current accumulator.
    pub async fn accumulator(&self) -> CampaignResult<Option<Record<FoldDatum>>> {
        fetch_accumulator(&self.gateway, &self.ctx).await
    }

    async fn execute(&self, planned: PlannedTx) -> CampaignResult<TxId> {
        submit_and_confirm(&self.gateway, &planned, self.confirmation_timeout).await
    }

    /// Plans the creation of the accumulator from a fresh view of the ledger.
    pub async fn prepare_init(&self) -> CampaignResult<PlannedTx> {
        let now = self.gateway.current_time().await?;
        let store = SetStore::fetch(&self.gateway, &self.ctx).await?;
        let existing = self.accumulator().await?;
        plan_init(&self.ctx, &store, existing.as_ref(), self.operator, now)
    }

    /// Plans the next advance, starting from wherever the accumulator points now.
    pub async fn prepare_advance(&self) -> CampaignResult<PlannedTx> {
        let acc = self
            .accumulator()
            .await?
            .ok_or_else(|| CampaignError::NotFound("commit fold".to_string()))?;
        let store = SetStore::fetch(&self.gateway, &self.ctx).await?;
        let batch = next_batch(&store, &acc.datum.current_node, self.batch_size)?;
        plan_advance(&self.ctx, &acc, &batch, self.operator)
    }

    /// Plans the destruction of an accumulator that has not advanced.
    pub async fn prepare_reclaim(&self) -> CampaignResult<PlannedTx> {
        let acc = self
            .accumulator()
            .await?
            .ok_or_else(|| CampaignError::NotFound("commit fold".to_string()))?;
        plan_reclaim(&self.ctx, &acc, self.operator)
    }

    /// Creates the accumulator.
    pub async fn init(&self) -> CampaignResult<TxId> {
        self.execute(self.prepare_init().await?).await
    }

    /// Absorbs the next batch.
    pub async fn advance(&self) -> CampaignResult<TxId> {
        self.execute(self.prepare_advance().await?).await
    }

    /// Destroys the accumulator before it advanced.
    pub async fn reclaim(&self) -> CampaignResult<TxId> {
        self.execute(self.prepare_reclaim().await?).await
    }

    /// Advances until the accumulator is closed and returns its final state.
    pub async fn fold_all(&self) -> CampaignResult<FoldDatum> {
        loop {
            let acc = self
                .accumulator()
                .await?
                .ok_or_else(|| CampaignError::NotFound("commit fold".to_string()))?;
            if acc.datum.is_closed() {
                info!(staked_total = acc.datum.staked_total, "commit fold closed");
                return Ok(acc.datum);
            }
            self.advance().await?;
        }
    }
}
