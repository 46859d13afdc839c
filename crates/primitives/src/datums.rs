//! Records stored as inline datums on the ledger.
//!
//! Field order and constructor tags are fixed by the authorization scripts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    address::Address,
    errors::{CampaignError, CampaignResult, DecodeError},
    hashes::PubKeyHash,
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
    time::PosixTime,
    utxo::OutputRef,
    value::{AssetClass, AssetName},
};

/// Encodes an optional node key as `Key{bytes}` (constr 0) or `Empty` (constr 1).
pub fn encode_node_key(key: Option<&PubKeyHash>) -> PlutusData {
    match key {
        Some(key) => PlutusData::constr(0, vec![PlutusData::bytes(key)]),
        None => PlutusData::constr(1, vec![]),
    }
}

/// Decodes an optional node key.
pub fn decode_node_key(data: &PlutusData) -> Result<Option<PubKeyHash>, DecodeError> {
    match data.as_constr()? {
        (0, [bytes]) => Ok(Some(PubKeyHash::from_slice(bytes.as_bytes()?)?)),
        (1, []) => Ok(None),
        _ => Err(DecodeError::UnexpectedShape {
            expected: "node key".to_string(),
            got: format!("{data:?}"),
        }),
    }
}

/// One element of the on-ledger sorted set.
///
/// `key == None` is the head sentinel, `next == None` terminates the chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SetNode {
    /// The participant key, `None` for the head.
    pub key: Option<PubKeyHash>,
    /// The successor key, `None` at the tail.
    pub next: Option<PubKeyHash>,
    /// Campaign this node belongs to.
    pub campaign_token: AssetName,
}

impl SetNode {
    /// A fresh head sentinel for an empty set.
    pub const fn head(campaign_token: AssetName) -> Self {
        Self {
            key: None,
            next: None,
            campaign_token,
        }
    }

    /// Whether this node is the head sentinel.
    pub const fn is_head(&self) -> bool {
        self.key.is_none()
    }

    /// Whether this node is the last one in the chain.
    pub const fn is_tail(&self) -> bool {
        self.next.is_none()
    }

    /// Whether `key` belongs strictly between this node's key and its successor.
    pub fn covers(&self, key: &PubKeyHash) -> bool {
        let after_self = self.key.as_ref().map_or(true, |own| own < key);
        let before_next = self.next.as_ref().map_or(true, |next| key < next);
        after_self && before_next
    }

    /// Returns the same node pointing at a different successor.
    pub fn with_next(&self, next: Option<PubKeyHash>) -> Self {
        Self {
            next,
            ..self.clone()
        }
    }
}

impl ToPlutusData for SetNode {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                encode_node_key(self.key.as_ref()),
                encode_node_key(self.next.as_ref()),
                PlutusData::bytes(self.campaign_token.as_bytes()),
            ],
        )
    }
}

impl FromPlutusData for SetNode {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let fields = data.expect_constr(0, 3)?;
        Ok(SetNode {
            key: decode_node_key(&fields[0])?,
            next: decode_node_key(&fields[1])?,
            campaign_token: AssetName::new(fields[2].as_bytes()?)?,
        })
    }
}

/// State of the commit fold accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldDatum {
    /// The last node absorbed (the head right after creation).
    pub current_node: SetNode,
    /// Sum of the stakes absorbed so far.
    pub staked_total: u64,
    /// Who created the accumulator and may reclaim it.
    pub owner: Address,
}

impl FoldDatum {
    /// Whether every node has been absorbed.
    pub const fn is_closed(&self) -> bool {
        self.current_node.is_tail()
    }
}

impl ToPlutusData for FoldDatum {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                self.current_node.to_plutus_data(),
                PlutusData::uint(self.staked_total),
                self.owner.to_plutus_data(),
            ],
        )
    }
}

impl FromPlutusData for FoldDatum {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let fields = data.expect_constr(0, 3)?;
        Ok(FoldDatum {
            current_node: SetNode::from_plutus_data(&fields[0])?,
            staked_total: fields[1].as_u64()?,
            owner: Address::from_plutus_data(&fields[2])?,
        })
    }
}

/// State of the reward fold accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardFoldDatum {
    /// The last node paid (the head right after creation).
    pub current_node: SetNode,
    /// The full reward pool, fixed at creation.
    pub total_reward_tokens: u64,
    /// The closed commit fold total, fixed at creation.
    pub total_staked: u64,
    /// Who created the accumulator and may reclaim the dust.
    pub owner: Address,
}

impl RewardFoldDatum {
    /// Whether every node has been paid.
    pub const fn is_closed(&self) -> bool {
        self.current_node.is_tail()
    }

    /// The share of the pool owed to a node holding `stake`.
    ///
    /// Floors the exact share; nothing is owed when nothing was staked.
    pub fn owed(&self, stake: u64) -> u64 {
        if self.total_staked == 0 {
            return 0;
        }
        let owed = u128::from(stake) * u128::from(self.total_reward_tokens)
            / u128::from(self.total_staked);
        u64::try_from(owed).unwrap_or(u64::MAX)
    }
}

impl ToPlutusData for RewardFoldDatum {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                self.current_node.to_plutus_data(),
                PlutusData::uint(self.total_reward_tokens),
                PlutusData::uint(self.total_staked),
                self.owner.to_plutus_data(),
            ],
        )
    }
}

impl FromPlutusData for RewardFoldDatum {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let fields = data.expect_constr(0, 4)?;
        Ok(RewardFoldDatum {
            current_node: SetNode::from_plutus_data(&fields[0])?,
            total_reward_tokens: fields[1].as_u64()?,
            total_staked: fields[2].as_u64()?,
            owner: Address::from_plutus_data(&fields[3])?,
        })
    }
}

/// Immutable campaign parameters, published once and read by nearly every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// One-shot output that makes the campaign (and its token) unique.
    pub init_utxo: OutputRef,
    /// From this instant on, stakes are frozen.
    pub freeze: PosixTime,
    /// From this instant on, staking is over.
    pub end: PosixTime,
    /// Receives the penalty of participants leaving during the freeze.
    pub penalty_address: Address,
    /// The asset participants stake.
    pub stake_asset: AssetClass,
    /// Smallest accepted stake.
    pub minimum_stake: u64,
    /// The asset distributed as reward.
    pub reward_asset: AssetClass,
}

impl CampaignConfig {
    /// Name of the token identifying this campaign, derived from the one-shot output.
    pub fn campaign_token_name(&self) -> AssetName {
        let digest: [u8; 32] = Sha256::digest(self.init_utxo.to_plutus_data().to_cbor()).into();
        AssetName::new(digest).unwrap_or_default()
    }

    /// Checks the parameters for internal consistency.
    pub fn validate(&self) -> CampaignResult<()> {
        if self.freeze >= self.end {
            return Err(CampaignError::Configuration(format!(
                "freeze ({}) must be before end ({})",
                self.freeze, self.end
            )));
        }
        if self.stake_asset.is_lovelace() || self.reward_asset.is_lovelace() {
            return Err(CampaignError::Configuration(
                "stake and reward assets must be native tokens".to_string(),
            ));
        }
        if self.minimum_stake == 0 {
            return Err(CampaignError::Configuration(
                "minimum stake must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl ToPlutusData for CampaignConfig {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                self.init_utxo.to_plutus_data(),
                self.freeze.to_plutus_data(),
                self.end.to_plutus_data(),
                self.penalty_address.to_plutus_data(),
                self.stake_asset.to_plutus_data(),
                PlutusData::uint(self.minimum_stake),
                self.reward_asset.to_plutus_data(),
            ],
        )
    }
}

impl FromPlutusData for CampaignConfig {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        let fields = data.expect_constr(0, 7)?;
        Ok(CampaignConfig {
            init_utxo: OutputRef::from_plutus_data(&fields[0])?,
            freeze: PosixTime::from_plutus_data(&fields[1])?,
            end: PosixTime::from_plutus_data(&fields[2])?,
            penalty_address: Address::from_plutus_data(&fields[3])?,
            stake_asset: AssetClass::from_plutus_data(&fields[4])?,
            minimum_stake: fields[5].as_u64()?,
            reward_asset: AssetClass::from_plutus_data(&fields[6])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashes::{PolicyId, TxId};

    fn pkh(byte: u8) -> PubKeyHash {
        PubKeyHash::new([byte; 28])
    }

    fn config() -> CampaignConfig {
        let policy = PolicyId::new([9; 28]);
        CampaignConfig {
            init_utxo: OutputRef::new(TxId::digest(b"init"), 0),
            freeze: PosixTime(1_000),
            end: PosixTime(2_000),
            penalty_address: Address::from_key(pkh(0xee)),
            stake_asset: AssetClass::new(policy, AssetName::new(*b"STAKE").unwrap()),
            minimum_stake: 100,
            reward_asset: AssetClass::new(policy, AssetName::new(*b"REWARD").unwrap()),
        }
    }

    #[test]
    fn test_head_covers_everything_when_empty() {
        let head = SetNode::head(AssetName::empty());
        assert!(head.covers(&pkh(0)));
        assert!(head.covers(&pkh(0xff)));
    }

    #[test]
    fn test_covers_is_strict_on_both_sides() {
        let node = SetNode {
            key: Some(pkh(2)),
            next: Some(pkh(5)),
            campaign_token: AssetName::empty(),
        };
        assert!(!node.covers(&pkh(2)));
        assert!(node.covers(&pkh(3)));
        assert!(!node.covers(&pkh(5)));
        assert!(!node.covers(&pkh(1)));
    }

    #[test]
    fn test_set_node_encoding_uses_key_and_empty() {
        let node = SetNode {
            key: None,
            next: Some(pkh(1)),
            campaign_token: AssetName::new(*b"camp").unwrap(),
        };
        let expected = PlutusData::constr(
            0,
            vec![
                PlutusData::constr(1, vec![]),
                PlutusData::constr(0, vec![PlutusData::bytes([1; 28])]),
                PlutusData::bytes(b"camp"),
            ],
        );
        assert_eq!(node.to_plutus_data(), expected);
        assert_eq!(SetNode::from_plutus_data(&expected).unwrap(), node);
    }

    #[test]
    fn test_fold_datum_survives_cbor() {
        let datum = FoldDatum {
            current_node: SetNode::head(AssetName::empty()).with_next(Some(pkh(4))),
            staked_total: 14_000,
            owner: Address::from_key(pkh(1)),
        };
        let cbor = datum.to_plutus_data().to_cbor();
        let decoded = FoldDatum::from_plutus_data(&PlutusData::from_cbor(&cbor).unwrap()).unwrap();
        assert_eq!(decoded, datum);
        assert!(!decoded.is_closed());
    }

    #[test]
    fn test_owed_floors_the_share() {
        let datum = RewardFoldDatum {
            current_node: SetNode::head(AssetName::empty()),
            total_reward_tokens: 8_000_000_000_000,
            total_staked: 14_000,
            owner: Address::from_key(pkh(1)),
        };
        assert_eq!(datum.owed(4_000), 2_285_714_285_714);
        assert_eq!(datum.owed(5_000), 2_857_142_857_142);
        let paid = datum.owed(4_000) + 2 * datum.owed(5_000);
        assert!(paid <= datum.total_reward_tokens);
        assert_eq!(datum.total_reward_tokens - paid, 2);
    }

    #[test]
    fn test_owed_is_zero_without_stake() {
        let datum = RewardFoldDatum {
            current_node: SetNode::head(AssetName::empty()),
            total_reward_tokens: 1_000,
            total_staked: 0,
            owner: Address::from_key(pkh(1)),
        };
        assert_eq!(datum.owed(0), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(config().validate().is_ok());

        let mut bad = config();
        bad.freeze = bad.end;
        assert_eq!(
            bad.validate().unwrap_err().kind(),
            crate::errors::ErrorKind::Configuration
        );

        let mut bad = config();
        bad.reward_asset = AssetClass::lovelace();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.minimum_stake = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_encoding_and_token_name() {
        let config = config();
        let decoded = CampaignConfig::from_plutus_data(&config.to_plutus_data()).unwrap();
        assert_eq!(decoded, config);
        assert_eq!(config.campaign_token_name().as_bytes().len(), 32);

        let mut other = config.clone();
        other.init_utxo.index = 1;
        assert_ne!(other.campaign_token_name(), config.campaign_token_name());
    }
}
