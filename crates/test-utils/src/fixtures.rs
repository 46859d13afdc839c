//! Deterministic parameters and a ready-to-use campaign on the emulator.

use std::{sync::Arc, time::Duration};

use campaign_ledger::context::CampaignContext;
use campaign_params::{protocol::ProtocolParams, scripts::ScriptParams, CampaignParams};
use campaign_primitives::{
    address::Address,
    constants::LOVELACE_PER_ADA,
    datums::CampaignConfig,
    hashes::{PolicyId, PubKeyHash, ScriptHash},
    time::PosixTime,
    utxo::{OutputRef, TxOutput, Utxo},
    value::{AssetClass, AssetName, Value},
};
use proptest::prelude::*;

use crate::emulator::LedgerEmulator;

/// Clock reading at which fixture ledgers start.
pub const GENESIS: PosixTime = PosixTime(1_700_000_000_000);

/// Smallest stake accepted by fixture campaigns.
pub const MINIMUM_STAKE: u64 = 1_000;

/// A deterministic key.
pub fn key(b: u8) -> PubKeyHash {
    PubKeyHash::new([b; 28])
}

/// Script hashes of a fixture deployment.
pub fn script_params() -> ScriptParams {
    let h = |b: u8| ScriptHash::new([b; 28]);
    let p = |b: u8| PolicyId::new([b; 28]);
    ScriptParams {
        node_validator: h(0x11),
        node_policy: p(0x12),
        config_validator: h(0x13),
        config_policy: p(0x14),
        commit_fold_validator: h(0x15),
        commit_fold_policy: p(0x16),
        reward_fold_validator: h(0x17),
        reward_fold_policy: p(0x18),
        reward_fold_stake: h(0x19),
        reward_pool_validator: h(0x1a),
        reward_pool_policy: p(0x1b),
    }
}

/// Default protocol parameters with the fixture script hashes.
pub fn campaign_params() -> CampaignParams {
    CampaignParams {
        protocol: ProtocolParams::default(),
        scripts: script_params(),
    }
}

/// The token participants stake.
pub fn stake_asset() -> AssetClass {
    AssetClass::new(PolicyId::new([0x21; 28]), fixed_name(b"STAKE"))
}

/// The token paid out as reward.
pub fn reward_asset() -> AssetClass {
    AssetClass::new(PolicyId::new([0x22; 28]), fixed_name(b"REWARD"))
}

/// Where early withdrawal penalties go in fixture campaigns.
pub fn penalty_address() -> Address {
    Address::from_key(key(0xee))
}

/// A campaign config staking [`stake_asset`] for [`reward_asset`].
pub fn campaign_config(init_utxo: OutputRef, freeze: PosixTime, end: PosixTime) -> CampaignConfig {
    CampaignConfig {
        init_utxo,
        freeze,
        end,
        penalty_address: penalty_address(),
        stake_asset: stake_asset(),
        minimum_stake: MINIMUM_STAKE,
        reward_asset: reward_asset(),
    }
}

/// Distinct participant keys, in no particular order.
pub fn arb_keys(max: usize) -> impl Strategy<Value = Vec<PubKeyHash>> {
    prop::collection::btree_set(any::<[u8; 28]>(), 1..=max)
        .prop_map(|set| set.into_iter().map(PubKeyHash::new).collect::<Vec<_>>())
        .prop_shuffle()
}

fn fixed_name(bytes: &[u8]) -> AssetName {
    AssetName::new(bytes).unwrap_or_default()
}

/// A deployed campaign on a fresh emulator.
///
/// The config record is seeded directly; the creator's wallet holds the unique output the
/// campaign is named after.
#[derive(Debug, Clone)]
pub struct CampaignFixture {
    /// The ledger.
    pub ledger: Arc<LedgerEmulator>,
    /// The deployed campaign.
    pub ctx: CampaignContext,
    /// Who deployed it.
    pub creator: PubKeyHash,
}

impl CampaignFixture {
    /// Deploys a campaign freezing `freeze_in` after [`GENESIS`] and ending `end_in` after it.
    pub async fn new(freeze_in: Duration, end_in: Duration) -> Self {
        let ledger = Arc::new(LedgerEmulator::new(GENESIS));
        let creator = key(0xc0);
        ledger
            .fund(creator, Value::from_lovelace(1_000 * LOVELACE_PER_ADA))
            .await;
        let init = ledger
            .fund(creator, Value::from_lovelace(5 * LOVELACE_PER_ADA))
            .await;

        let params = campaign_params();
        let config = campaign_config(init.out_ref, GENESIS + freeze_in, GENESIS + end_in);
        let token = params.scripts.campaign_token(config.campaign_token_name());
        let config_utxo = ledger
            .seed(
                TxOutput::new(
                    params.scripts.config_address(),
                    Value::from_lovelace(params.protocol.record_floor).with(token, 1),
                )
                .with_datum(&config),
            )
            .await;

        Self {
            ledger,
            ctx: CampaignContext::new(params, config, config_utxo),
            creator,
        }
    }

    /// The output the campaign is named after, still unspent in the creator's wallet until the
    /// set is initialized.
    pub async fn init_utxo(&self) -> Option<Utxo> {
        self.ledger.utxo(&self.ctx.config.init_utxo).await
    }

    /// Gives `who` enough native coin to pay node floors plus `stake` of the staked token.
    pub async fn fund_participant(&self, who: PubKeyHash, stake: u64) {
        self.ledger
            .fund(
                who,
                Value::from_lovelace(50 * LOVELACE_PER_ADA).with(stake_asset(), stake),
            )
            .await;
    }

    /// Gives `who` `amount` of the reward token.
    pub async fn fund_rewards(&self, who: PubKeyHash, amount: u64) {
        self.ledger
            .fund(
                who,
                Value::from_lovelace(10 * LOVELACE_PER_ADA).with(reward_asset(), amount),
            )
            .await;
    }

    /// Moves the clock just past the freeze time.
    pub async fn pass_freeze(&self) {
        let tolerance = self.ctx.protocol().validity_tolerance;
        self.ledger
            .set_time(self.ctx.config.freeze + tolerance + Duration::from_secs(1))
            .await;
    }

    /// Moves the clock just past the end time.
    pub async fn pass_end(&self) {
        let tolerance = self.ctx.protocol().validity_tolerance;
        self.ledger
            .set_time(self.ctx.config.end + tolerance + Duration::from_secs(1))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use campaign_ledger::gateway::LedgerGateway;

    use super::*;

    #[tokio::test]
    async fn test_fixture_config_is_loadable() {
        let fixture =
            CampaignFixture::new(Duration::from_secs(3_600), Duration::from_secs(7_200)).await;
        let loaded = CampaignContext::load(
            &*fixture.ledger,
            campaign_params(),
            &fixture.ctx.campaign_token(),
        )
        .await
        .unwrap();
        assert_eq!(loaded, fixture.ctx);
        assert!(fixture.init_utxo().await.is_some());
        assert_eq!(fixture.ledger.current_time().await.unwrap(), GENESIS);
    }
}
