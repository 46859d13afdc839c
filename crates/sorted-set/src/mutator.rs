//! Participant-side mutations of the sorted set.
//!
//! Every mutation is planned against a [`SetStore`] snapshot by a pure `plan_*` function and
//! then submitted as one atomic transaction. A plan built from a stale snapshot spends outputs
//! that no longer exist and is rejected by the ledger as a whole; the caller fetches again and
//! retries.

use std::time::Duration;

use campaign_ledger::{
    context::CampaignContext,
    gateway::LedgerGateway,
    skeleton::TxSkeleton,
    submit::{submit_and_confirm, PlannedTx},
};
use campaign_primitives::{
    address::Address,
    constants::PENALTY_DENOMINATOR,
    datums::SetNode,
    errors::{CampaignError, CampaignResult},
    hashes::{PubKeyHash, TxId},
    redeemers::{NodeSpendAct, SetNodeOp},
    time::{PosixTime, ValidityWindow},
    utxo::{TxOutput, Utxo},
    value::{AssetClass, Value},
};
use tracing::info;

use crate::store::{NodeRecord, SetStore};

/// How long mutations wait for their transaction to settle unless told otherwise.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Share of a stake withheld when it is withdrawn between the freeze and the end of staking.
pub fn early_withdrawal_penalty(stake: u64) -> u64 {
    stake.div_ceil(PENALTY_DENOMINATOR)
}

fn node_output(ctx: &CampaignContext, node: &SetNode, value: Value) -> TxOutput {
    TxOutput::new(ctx.scripts().node_address(), value).with_datum(node)
}

fn membership_token(ctx: &CampaignContext, key: Option<&PubKeyHash>) -> AssetClass {
    match key {
        Some(key) => ctx.scripts().node_token(key),
        None => ctx.scripts().head_token(),
    }
}

/// The node's value without its membership token.
fn unlocked_value(ctx: &CampaignContext, record: &NodeRecord) -> CampaignResult<Value> {
    let mut value = record.utxo.value().clone();
    value
        .remove(&membership_token(ctx, record.key()), 1)
        .ok_or_else(|| {
            CampaignError::NotFound(format!("membership token in {}", record.utxo.out_ref))
        })?;
    Ok(value)
}

/// The window of a transaction that must settle while staking is open.
fn staking_window(ctx: &CampaignContext, now: PosixTime) -> CampaignResult<ValidityWindow> {
    let window = ctx.validity_window(now);
    if window.entirely_before(ctx.config.freeze) {
        Ok(window)
    } else {
        Err(CampaignError::Phase(format!(
            "staking closes at {}, transaction window reaches {}",
            ctx.config.freeze, window.upper
        )))
    }
}

/// Plans the creation of the head sentinel, spending the campaign's one-shot `init_utxo`.
pub fn plan_init_set(
    ctx: &CampaignContext,
    store: &SetStore,
    init_utxo: &Utxo,
    signer: PubKeyHash,
    now: PosixTime,
) -> CampaignResult<PlannedTx> {
    if let Some(head) = store.head() {
        return Err(CampaignError::DuplicateKey(format!(
            "head already exists at {}",
            head.utxo.out_ref
        )));
    }
    let window = staking_window(ctx, now)?;
    let head_token = ctx.scripts().head_token();

    let mut tx = TxSkeleton::new("init-set");
    tx.spend_from_wallet(init_utxo)
        .read(&ctx.config_utxo)
        .mint(head_token.clone(), 1, &SetNodeOp::Init)
        .valid_in(window)
        .require_signer(signer);
    tx.pay(node_output(
        ctx,
        &SetNode::head(ctx.campaign_token()),
        Value::from_lovelace(ctx.protocol().node_floor).with(head_token, 1),
    ));
    Ok(PlannedTx::new(tx, signer))
}

/// Plans the insertion of `key` staking `amount`.
pub fn plan_insert(
    ctx: &CampaignContext,
    store: &SetStore,
    key: PubKeyHash,
    amount: u64,
    now: PosixTime,
) -> CampaignResult<PlannedTx> {
    let window = staking_window(ctx, now)?;
    if amount < ctx.config.minimum_stake {
        return Err(CampaignError::BelowMinimumStake {
            amount,
            minimum: ctx.config.minimum_stake,
        });
    }
    if store.contains(&key) {
        return Err(CampaignError::DuplicateKey(format!("{key} already staked")));
    }
    let covering = store
        .covering(&key)
        .ok_or_else(|| CampaignError::NotFound(format!("covering node for {key}")))?;

    let token = ctx.scripts().node_token(&key);
    let node = SetNode {
        key: Some(key),
        next: covering.node.next,
        campaign_token: ctx.campaign_token(),
    };
    let value = Value::from_lovelace(ctx.protocol().node_floor)
        .with(ctx.config.stake_asset.clone(), amount)
        .with(token.clone(), 1);

    let mut tx = TxSkeleton::new("insert");
    tx.spend(&covering.utxo, &NodeSpendAct::LinkedListAct)
        .read(&ctx.config_utxo)
        .mint(
            token,
            1,
            &SetNodeOp::Insert {
                key,
                covering_node: covering.node.clone(),
            },
        )
        .valid_in(window)
        .require_signer(key);
    tx.pay(node_output(
        ctx,
        &covering.node.with_next(Some(key)),
        covering.utxo.value().clone(),
    ));
    tx.pay(node_output(ctx, &node, value));

    info!(%key, amount, covering = ?covering.key(), "planned insert");
    Ok(PlannedTx::new(tx, key))
}

/// Plans the withdrawal of `key` before the end of staking.
///
/// The whole stake goes back before the freeze; afterwards a quarter (rounded up) goes to the
/// penalty address.
pub fn plan_remove(
    ctx: &CampaignContext,
    store: &SetStore,
    key: PubKeyHash,
    now: PosixTime,
) -> CampaignResult<PlannedTx> {
    let record = store
        .get(&key)
        .ok_or_else(|| CampaignError::NotFound(format!("node {key}")))?;
    if record.is_marked(ctx.protocol()) {
        return Err(CampaignError::PhaseOverlap(format!(
            "node {key} already received its reward, claim it instead"
        )));
    }

    let (freeze, end) = (ctx.config.freeze, ctx.config.end);
    let window = ctx.validity_window(now);
    let penalised = if window.entirely_before(freeze) {
        false
    } else if window.entirely_after(freeze) && window.entirely_before(end) {
        true
    } else if window.entirely_after(end) {
        return Err(CampaignError::Phase(format!(
            "staking ended at {end}, node {key} can only be claimed after reward processing"
        )));
    } else {
        return Err(CampaignError::Phase(format!(
            "transaction window [{}, {}] straddles a phase boundary",
            window.lower, window.upper
        )));
    };

    let predecessor = store
        .predecessor(&key)
        .ok_or_else(|| CampaignError::NotFound(format!("predecessor of {key}")))?;

    let mut refund = unlocked_value(ctx, record)?;
    let stake = ctx.stake_of(&refund);
    let penalty = if penalised {
        early_withdrawal_penalty(stake)
    } else {
        0
    };

    let mut tx = TxSkeleton::new("remove");
    tx.spend(&record.utxo, &NodeSpendAct::LinkedListAct)
        .spend(&predecessor.utxo, &NodeSpendAct::LinkedListAct)
        .read(&ctx.config_utxo)
        .mint(
            ctx.scripts().node_token(&key),
            -1,
            &SetNodeOp::Remove {
                key,
                covering_node: predecessor.node.clone(),
            },
        )
        .valid_in(window)
        .require_signer(key);
    tx.pay(node_output(
        ctx,
        &predecessor.node.with_next(record.node.next),
        predecessor.utxo.value().clone(),
    ));
    if penalty > 0 {
        refund
            .remove(&ctx.config.stake_asset, penalty)
            .ok_or_else(|| CampaignError::NotFound(format!("stake of {key}")))?;
        tx.pay(TxOutput::new(
            ctx.config.penalty_address.clone(),
            Value::zero().with(ctx.config.stake_asset.clone(), penalty),
        ));
    }
    tx.pay(TxOutput::new(Address::from_key(key), refund));

    info!(%key, stake, penalty, "planned remove");
    Ok(PlannedTx::new(tx, key))
}

/// Plans the final claim of a node that received its reward.
pub fn plan_claim(
    ctx: &CampaignContext,
    store: &SetStore,
    key: PubKeyHash,
    now: PosixTime,
) -> CampaignResult<PlannedTx> {
    let record = store
        .get(&key)
        .ok_or_else(|| CampaignError::NotFound(format!("node {key}")))?;
    let window = ctx.validity_window(now);
    if !window.entirely_after(ctx.config.end) {
        return Err(CampaignError::PhaseOverlap(format!(
            "claims open at {}",
            ctx.config.end
        )));
    }
    if !record.is_marked(ctx.protocol()) {
        return Err(CampaignError::Phase(format!(
            "node {key} has not received its reward yet"
        )));
    }

    let payout = unlocked_value(ctx, record)?;
    let mut tx = TxSkeleton::new("claim");
    tx.spend(&record.utxo, &NodeSpendAct::LinkedListAct)
        .read(&ctx.config_utxo)
        .mint(
            ctx.scripts().node_token(&key),
            -1,
            &SetNodeOp::Claim { key },
        )
        .valid_in(window)
        .require_signer(key);
    tx.pay(TxOutput::new(Address::from_key(key), payout));

    info!(
        %key,
        reward = ctx.reward_of(record.utxo.value()),
        "planned claim"
    );
    Ok(PlannedTx::new(tx, key))
}

/// Plans an in-place change of `key`'s stake to `new_amount`.
pub fn plan_modify(
    ctx: &CampaignContext,
    store: &SetStore,
    key: PubKeyHash,
    new_amount: u64,
    now: PosixTime,
) -> CampaignResult<PlannedTx> {
    let record = store
        .get(&key)
        .ok_or_else(|| CampaignError::NotFound(format!("node {key}")))?;
    let window = staking_window(ctx, now)?;
    let stake_asset = &ctx.config.stake_asset;
    let current = record.amount_of(stake_asset);
    if new_amount == current {
        return Err(CampaignError::NoChange(format!(
            "{key} already stakes {current}"
        )));
    }
    if new_amount < ctx.config.minimum_stake {
        return Err(CampaignError::BelowMinimumStake {
            amount: new_amount,
            minimum: ctx.config.minimum_stake,
        });
    }

    let mut value = record.utxo.value().clone();
    value
        .remove(stake_asset, current)
        .ok_or_else(|| CampaignError::NotFound(format!("stake of {key}")))?;
    value.add(stake_asset.clone(), new_amount);

    let mut tx = TxSkeleton::new("modify");
    tx.spend(&record.utxo, &NodeSpendAct::ModifyCommitment)
        .read(&ctx.config_utxo)
        .valid_in(window)
        .require_signer(key);
    tx.pay(node_output(ctx, &record.node, value));
    if new_amount < current {
        tx.pay(TxOutput::new(
            Address::from_key(key),
            Value::zero().with(stake_asset.clone(), current - new_amount),
        ));
    }

    info!(%key, from = current, to = new_amount, "planned modify");
    Ok(PlannedTx::new(tx, key))
}

/// Plans the destruction of the head sentinel once rewards are distributed.
pub fn plan_deinit(
    ctx: &CampaignContext,
    store: &SetStore,
    reward_fold_live: bool,
    signer: PubKeyHash,
) -> CampaignResult<PlannedTx> {
    let head = store
        .head()
        .ok_or_else(|| CampaignError::NotFound("head node".to_string()))?;
    if !head.is_marked(ctx.protocol()) {
        return Err(CampaignError::Phase(
            "reward processing has not started".to_string(),
        ));
    }
    if reward_fold_live {
        return Err(CampaignError::Phase(
            "reward fold still in progress".to_string(),
        ));
    }

    let mut tx = TxSkeleton::new("deinit-set");
    tx.spend(&head.utxo, &NodeSpendAct::LinkedListAct)
        .read(&ctx.config_utxo)
        .mint(ctx.scripts().head_token(), -1, &SetNodeOp::DeInit)
        .require_signer(signer);
    Ok(PlannedTx::new(tx, signer))
}

/// Fetches, plans and submits set mutations on behalf of participants and the campaign creator.
#[derive(Debug, Clone)]
pub struct SetMutator<G> {
    gateway: G,
    ctx: CampaignContext,
    confirmation_timeout: Duration,
}

impl<G: LedgerGateway> SetMutator<G> {
    /// Creates a mutator for the campaign described by `ctx`.
    pub const fn new(gateway: G, ctx: CampaignContext) -> Self {
        Self {
            gateway,
            ctx,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    /// Overrides how long to wait for each transaction.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    /// The campaign acted on.
    pub const fn context(&self) -> &CampaignContext {
        &self.ctx
    }

    /// A fresh snapshot of the set.
    pub async fn store(&self) -> CampaignResult<SetStore> {
        SetStore::fetch(&self.gateway, &self.ctx).await
    }

    async fn execute(&self, planned: PlannedTx) -> CampaignResult<TxId> {
        submit_and_confirm(&self.gateway, &planned, self.confirmation_timeout).await
    }

    /// Plans the creation of the head sentinel; `signer` must hold the campaign's `init_utxo`.
    pub async fn prepare_init_set(&self, signer: PubKeyHash) -> CampaignResult<PlannedTx> {
        let now = self.gateway.current_time().await?;
        let store = self.store().await?;
        if let Some(head) = store.head() {
            return Err(CampaignError::DuplicateKey(format!(
                "head already exists at {}",
                head.utxo.out_ref
            )));
        }
        let init_ref = self.ctx.config.init_utxo;
        let wallet = self.gateway.wallet_utxos(&signer).await?;
        let init_utxo = wallet
            .into_iter()
            .find(|u| u.out_ref == init_ref)
            .ok_or_else(|| {
                CampaignError::Configuration(format!("{init_ref} is not in the wallet of {signer}"))
            })?;
        plan_init_set(&self.ctx, &store, &init_utxo, signer, now)
    }

    /// Creates the head sentinel.
    pub async fn init_set(&self, signer: PubKeyHash) -> CampaignResult<TxId> {
        self.execute(self.prepare_init_set(signer).await?).await
    }

    /// Stakes `amount` under `key`.
    pub async fn insert(&self, key: PubKeyHash, amount: u64) -> CampaignResult<TxId> {
        let now = self.gateway.current_time().await?;
        let store = self.store().await?;
        self.execute(plan_insert(&self.ctx, &store, key, amount, now)?)
            .await
    }

    /// Withdraws `key`'s stake before the end of staking.
    pub async fn remove(&self, key: PubKeyHash) -> CampaignResult<TxId> {
        let now = self.gateway.current_time().await?;
        let store = self.store().await?;
        self.execute(plan_remove(&self.ctx, &store, key, now)?).await
    }

    /// Collects `key`'s stake and reward after the reward fold paid it.
    pub async fn claim(&self, key: PubKeyHash) -> CampaignResult<TxId> {
        let now = self.gateway.current_time().await?;
        let store = self.store().await?;
        self.execute(plan_claim(&self.ctx, &store, key, now)?).await
    }

    /// Changes `key`'s stake to `new_amount`.
    pub async fn modify(&self, key: PubKeyHash, new_amount: u64) -> CampaignResult<TxId> {
        let now = self.gateway.current_time().await?;
        let store = self.store().await?;
        self.execute(plan_modify(&self.ctx, &store, key, new_amount, now)?)
            .await
    }

    /// Plans the destruction of the head sentinel.
    pub async fn prepare_deinit(&self, signer: PubKeyHash) -> CampaignResult<PlannedTx> {
        let store = self.store().await?;
        let scripts = self.ctx.scripts();
        let reward_folds = self
            .gateway
            .utxos_with_asset(&scripts.reward_fold_address(), &scripts.reward_fold_token())
            .await?;
        plan_deinit(&self.ctx, &store, !reward_folds.is_empty(), signer)
    }

    /// Destroys the head sentinel.
    pub async fn deinit(&self, signer: PubKeyHash) -> CampaignResult<TxId> {
        self.execute(self.prepare_deinit(signer).await?).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use campaign_primitives::errors::ErrorKind;
    use campaign_test_utils::{
        emulator::LedgerEmulator,
        fixtures::{arb_keys, key, stake_asset, CampaignFixture},
    };
    use proptest::prelude::*;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3_600);

    async fn setup() -> (CampaignFixture, SetMutator<Arc<LedgerEmulator>>) {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        let mutator = SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone());
        mutator.init_set(fixture.creator).await.unwrap();
        (fixture, mutator)
    }

    async fn stake(
        fixture: &CampaignFixture,
        mutator: &SetMutator<Arc<LedgerEmulator>>,
        who: u8,
        amount: u64,
    ) {
        fixture.fund_participant(key(who), amount).await;
        mutator.insert(key(who), amount).await.unwrap();
    }

    fn chain_keys(store: &SetStore) -> Vec<Option<PubKeyHash>> {
        store.walk().unwrap().iter().map(|r| r.node.key).collect()
    }

    #[test]
    fn test_penalty_rounds_up() {
        assert_eq!(early_withdrawal_penalty(4_000), 1_000);
        assert_eq!(early_withdrawal_penalty(5_001), 1_251);
        assert_eq!(early_withdrawal_penalty(1), 1);
    }

    #[tokio::test]
    async fn test_init_set_creates_single_head() {
        let (fixture, mutator) = setup().await;
        let store = mutator.store().await.unwrap();
        assert_eq!(chain_keys(&store), vec![None]);
        assert!(fixture.init_utxo().await.is_none());

        let err = mutator.init_set(fixture.creator).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    }

    #[tokio::test]
    async fn test_init_set_rejected_after_freeze() {
        let fixture = CampaignFixture::new(HOUR, 2 * HOUR).await;
        fixture.pass_freeze().await;
        let mutator = SetMutator::new(fixture.ledger.clone(), fixture.ctx.clone());
        let err = mutator.init_set(fixture.creator).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);
    }

    #[tokio::test]
    async fn test_inserts_keep_chain_sorted() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 0xc3, 5_000).await;
        stake(&fixture, &mutator, 0xa1, 4_000).await;
        stake(&fixture, &mutator, 0xb2, 5_000).await;

        let store = mutator.store().await.unwrap();
        assert_eq!(
            chain_keys(&store),
            vec![None, Some(key(0xa1)), Some(key(0xb2)), Some(key(0xc3))]
        );
        store.validate(fixture.ctx.scripts()).unwrap();
        assert_eq!(store.get(&key(0xa1)).unwrap().amount_of(&stake_asset()), 4_000);
    }

    #[tokio::test]
    async fn test_insert_failures() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 1, 4_000).await;

        fixture.fund_participant(key(1), 4_000).await;
        let err = mutator.insert(key(1), 4_000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateKey);

        fixture.fund_participant(key(2), 10).await;
        let err = mutator.insert(key(2), 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BelowMinimumStake);

        let err = mutator.insert(key(3), 4_000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

        fixture.pass_freeze().await;
        let err = mutator.insert(key(2), 4_000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);
    }

    #[tokio::test]
    async fn test_insert_straddling_freeze_is_rejected() {
        let (fixture, mutator) = setup().await;
        fixture.fund_participant(key(1), 4_000).await;
        fixture.ledger.set_time(fixture.ctx.config.freeze).await;
        let err = mutator.insert(key(1), 4_000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);
    }

    #[tokio::test]
    async fn test_remove_straddling_freeze_or_end_is_rejected() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 1, 4_000).await;

        for boundary in [fixture.ctx.config.freeze, fixture.ctx.config.end] {
            fixture.ledger.set_time(boundary).await;
            let err = mutator.remove(key(1)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Phase);
        }
        assert!(mutator.store().await.unwrap().get(&key(1)).is_some());
    }

    #[tokio::test]
    async fn test_stale_snapshot_loses_race() {
        let (fixture, mutator) = setup().await;
        fixture.fund_participant(key(1), 4_000).await;
        fixture.fund_participant(key(2), 4_000).await;
        let now = fixture.ledger.now().await;
        let stale = mutator.store().await.unwrap();

        mutator.insert(key(1), 4_000).await.unwrap();
        let planned = plan_insert(&fixture.ctx, &stale, key(2), 4_000, now).unwrap();
        let err = submit_and_confirm(&*fixture.ledger, &planned, HOUR)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerRejection);

        mutator.insert(key(2), 4_000).await.unwrap();
        assert_eq!(mutator.store().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_before_freeze_refunds_everything() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 1, 4_000).await;
        stake(&fixture, &mutator, 2, 5_000).await;
        let before = fixture.ledger.balance_of(&key(1)).await;

        mutator.remove(key(1)).await.unwrap();

        let after = fixture.ledger.balance_of(&key(1)).await;
        assert_eq!(after.amount_of(&stake_asset()), 4_000);
        assert_eq!(
            after.lovelace(),
            before.lovelace() + fixture.ctx.protocol().node_floor
        );
        let store = mutator.store().await.unwrap();
        assert_eq!(chain_keys(&store), vec![None, Some(key(2))]);
        assert_eq!(
            fixture
                .ledger
                .supply_of(&fixture.ctx.scripts().node_token(&key(1)))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn test_remove_after_freeze_pays_penalty() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 1, 5_001).await;
        fixture.pass_freeze().await;

        mutator.remove(key(1)).await.unwrap();

        let penalty_to = &fixture.ctx.config.penalty_address;
        assert_eq!(
            fixture.ledger.value_at(penalty_to).await.amount_of(&stake_asset()),
            1_251
        );
        assert_eq!(
            fixture.ledger.balance_of(&key(1)).await.amount_of(&stake_asset()),
            3_750
        );
    }

    #[tokio::test]
    async fn test_remove_failures() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 1, 4_000).await;

        let err = mutator.remove(key(9)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        fixture.pass_end().await;
        let err = mutator.remove(key(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);
    }

    #[tokio::test]
    async fn test_claim_requires_end_and_reward() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 1, 4_000).await;

        let err = mutator.claim(key(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PhaseOverlap);

        fixture.pass_end().await;
        let err = mutator.claim(key(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);
    }

    #[tokio::test]
    async fn test_modify_moves_stake_both_ways() {
        let (fixture, mutator) = setup().await;
        stake(&fixture, &mutator, 1, 4_000).await;
        fixture.fund_participant(key(1), 2_000).await;

        mutator.modify(key(1), 6_000).await.unwrap();
        let store = mutator.store().await.unwrap();
        assert_eq!(store.get(&key(1)).unwrap().amount_of(&stake_asset()), 6_000);
        assert_eq!(
            fixture.ledger.balance_of(&key(1)).await.amount_of(&stake_asset()),
            0
        );

        mutator.modify(key(1), 1_000).await.unwrap();
        assert_eq!(
            fixture.ledger.balance_of(&key(1)).await.amount_of(&stake_asset()),
            5_000
        );

        let err = mutator.modify(key(1), 1_000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoChange);
        let err = mutator.modify(key(1), 999).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BelowMinimumStake);

        fixture.pass_freeze().await;
        let err = mutator.modify(key(1), 2_000).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);
    }

    #[tokio::test]
    async fn test_deinit_requires_marked_head() {
        let (fixture, mutator) = setup().await;
        fixture.pass_end().await;
        let err = mutator.deinit(fixture.creator).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Phase);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_any_insertion_order_yields_ascending_chain(keys in arb_keys(12)) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let chain = runtime.block_on(async {
                let (fixture, mutator) = setup().await;
                for key in &keys {
                    fixture.fund_participant(*key, 1_000).await;
                    mutator.insert(*key, 1_000).await.unwrap();
                }
                let store = mutator.store().await.unwrap();
                store.validate(fixture.ctx.scripts()).unwrap();
                chain_keys(&store)
            });

            let mut expected: Vec<_> = keys.iter().copied().map(Some).collect();
            expected.sort();
            expected.insert(0, None);
            prop_assert_eq!(chain, expected);
        }
    }
}
