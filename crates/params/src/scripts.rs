//! Hashes of the deployed authorization scripts and the addresses and tokens derived from them.

use campaign_primitives::{
    address::{Address, Credential},
    constants::{
        COMMIT_FOLD_TOKEN_NAME, NODE_TOKEN_PREFIX, REWARD_FOLD_TOKEN_NAME, REWARD_POOL_TOKEN_NAME,
    },
    hashes::{PolicyId, PubKeyHash, ScriptHash},
    value::{AssetClass, AssetName},
};
use serde::{Deserialize, Serialize};

/// Script hashes of one campaign deployment.
///
/// The scripts are compiled and parameterized elsewhere; only their hashes are needed to build
/// and recognize transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptParams {
    /// Validator guarding the set nodes.
    pub node_validator: ScriptHash,
    /// Policy minting the membership tokens.
    pub node_policy: PolicyId,
    /// Validator holding the campaign config record.
    pub config_validator: ScriptHash,
    /// Policy minting the campaign token carried by the config record.
    pub config_policy: PolicyId,
    /// Validator guarding the commit fold accumulator.
    pub commit_fold_validator: ScriptHash,
    /// Policy minting the commit fold token.
    pub commit_fold_policy: PolicyId,
    /// Validator guarding the reward fold accumulator.
    pub reward_fold_validator: ScriptHash,
    /// Policy minting the reward fold token.
    pub reward_fold_policy: PolicyId,
    /// Stake script authorizing multi-node reward fold batches through a zero withdrawal.
    pub reward_fold_stake: ScriptHash,
    /// Validator guarding the reward pool record.
    pub reward_pool_validator: ScriptHash,
    /// Policy minting the reward pool token.
    pub reward_pool_policy: PolicyId,
}

impl ScriptParams {
    /// Address of the set nodes.
    pub const fn node_address(&self) -> Address {
        Address::from_script(self.node_validator)
    }

    /// Address of the config record.
    pub const fn config_address(&self) -> Address {
        Address::from_script(self.config_validator)
    }

    /// Address of the commit fold accumulator.
    pub const fn commit_fold_address(&self) -> Address {
        Address::from_script(self.commit_fold_validator)
    }

    /// Address of the reward fold accumulator.
    pub const fn reward_fold_address(&self) -> Address {
        Address::from_script(self.reward_fold_validator)
    }

    /// Address of the reward pool record.
    pub const fn reward_pool_address(&self) -> Address {
        Address::from_script(self.reward_pool_validator)
    }

    /// Credential withdrawn from to authorize a multi-node reward fold batch.
    pub const fn reward_fold_stake_credential(&self) -> Credential {
        Credential::Script(self.reward_fold_stake)
    }

    /// The membership token of the head sentinel.
    pub fn head_token(&self) -> AssetClass {
        AssetClass::new(self.node_policy, node_token_name(None))
    }

    /// The membership token of `key`.
    pub fn node_token(&self, key: &PubKeyHash) -> AssetClass {
        AssetClass::new(self.node_policy, node_token_name(Some(key)))
    }

    /// The token carried by the config record of the campaign named `campaign_token`.
    pub const fn campaign_token(&self, campaign_token: AssetName) -> AssetClass {
        AssetClass::new(self.config_policy, campaign_token)
    }

    /// The token marking the commit fold accumulator.
    pub fn commit_fold_token(&self) -> AssetClass {
        AssetClass::new(self.commit_fold_policy, fixed_name(COMMIT_FOLD_TOKEN_NAME))
    }

    /// The token marking the reward fold accumulator.
    pub fn reward_fold_token(&self) -> AssetClass {
        AssetClass::new(self.reward_fold_policy, fixed_name(REWARD_FOLD_TOKEN_NAME))
    }

    /// The token marking the reward pool record.
    pub fn reward_pool_token(&self) -> AssetClass {
        AssetClass::new(self.reward_pool_policy, fixed_name(REWARD_POOL_TOKEN_NAME))
    }
}

/// Name of the membership token of `key`, or of the head for `None`.
pub fn node_token_name(key: Option<&PubKeyHash>) -> AssetName {
    let mut name = NODE_TOKEN_PREFIX.to_vec();
    if let Some(key) = key {
        name.extend_from_slice(key.as_bytes());
    }
    // "FSN" plus a 28-byte key is 31 bytes, below the 32-byte limit.
    AssetName::new(name).unwrap_or_default()
}

/// Recovers the key from a membership token name; `Some(None)` is the head token.
pub fn key_from_node_token(name: &AssetName) -> Option<Option<PubKeyHash>> {
    let rest = name.as_bytes().strip_prefix(NODE_TOKEN_PREFIX)?;
    if rest.is_empty() {
        return Some(None);
    }
    PubKeyHash::from_slice(rest).ok().map(Some)
}

fn fixed_name(bytes: &[u8]) -> AssetName {
    AssetName::new(bytes).unwrap_or_default()
}
