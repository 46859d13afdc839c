//! Operation selectors passed to the authorization scripts.

use serde::{Deserialize, Serialize};

use crate::{
    datums::SetNode,
    errors::DecodeError,
    hashes::PubKeyHash,
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
};

fn unexpected(what: &str, data: &PlutusData) -> DecodeError {
    DecodeError::UnexpectedShape {
        expected: what.to_string(),
        got: format!("{data:?}"),
    }
}

/// Encodes a list of batch positions.
fn encode_indices(indices: &[u32]) -> PlutusData {
    PlutusData::List(
        indices
            .iter()
            .map(|i| PlutusData::uint(u64::from(*i)))
            .collect(),
    )
}

fn decode_indices(data: &PlutusData) -> Result<Vec<u32>, DecodeError> {
    data.as_list()?
        .iter()
        .map(|item| {
            let value = item.as_integer()?;
            u32::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange(value))
        })
        .collect()
}

/// Implements the plutus encoding of a selector whose variants carry no fields.
macro_rules! unit_selector {
    ($name:ident { $($variant:ident = $tag:literal),+ $(,)? }) => {
        impl ToPlutusData for $name {
            fn to_plutus_data(&self) -> PlutusData {
                let tag = match self {
                    $($name::$variant => $tag,)+
                };
                PlutusData::constr(tag, vec![])
            }
        }

        impl FromPlutusData for $name {
            fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
                match data.as_constr()? {
                    $(($tag, []) => Ok($name::$variant),)+
                    _ => Err(unexpected(stringify!($name), data)),
                }
            }
        }
    };
}

/// Minting selector of the membership token policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetNodeOp {
    /// Creates the head sentinel.
    Init,
    /// Destroys the head sentinel.
    DeInit,
    /// Links a new node after `covering_node`.
    Insert {
        /// The new key.
        key: PubKeyHash,
        /// The node the key is inserted after, as it is before the insertion.
        covering_node: SetNode,
    },
    /// Unlinks `key` from its predecessor `covering_node`.
    Remove {
        /// The key being removed.
        key: PubKeyHash,
        /// The predecessor, as it is before the removal.
        covering_node: SetNode,
    },
    /// Burns the token of a node that has been paid its reward.
    Claim {
        /// The key being claimed.
        key: PubKeyHash,
    },
}

impl ToPlutusData for SetNodeOp {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            SetNodeOp::Init => PlutusData::constr(0, vec![]),
            SetNodeOp::DeInit => PlutusData::constr(1, vec![]),
            SetNodeOp::Insert { key, covering_node } => PlutusData::constr(
                2,
                vec![PlutusData::bytes(key), covering_node.to_plutus_data()],
            ),
            SetNodeOp::Remove { key, covering_node } => PlutusData::constr(
                3,
                vec![PlutusData::bytes(key), covering_node.to_plutus_data()],
            ),
            SetNodeOp::Claim { key } => PlutusData::constr(4, vec![PlutusData::bytes(key)]),
        }
    }
}

impl FromPlutusData for SetNodeOp {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        match data.as_constr()? {
            (0, []) => Ok(SetNodeOp::Init),
            (1, []) => Ok(SetNodeOp::DeInit),
            (2, [key, node]) => Ok(SetNodeOp::Insert {
                key: PubKeyHash::from_slice(key.as_bytes()?)?,
                covering_node: SetNode::from_plutus_data(node)?,
            }),
            (3, [key, node]) => Ok(SetNodeOp::Remove {
                key: PubKeyHash::from_slice(key.as_bytes()?)?,
                covering_node: SetNode::from_plutus_data(node)?,
            }),
            (4, [key]) => Ok(SetNodeOp::Claim {
                key: PubKeyHash::from_slice(key.as_bytes()?)?,
            }),
            _ => Err(unexpected("SetNodeOp", data)),
        }
    }
}

/// Spending selector of the node validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeSpendAct {
    /// The spend is justified by the membership token policy (insert, remove, claim, deinit).
    LinkedListAct,
    /// The owner changes the stake in place.
    ModifyCommitment,
    /// The reward fold rewrites the node.
    RewardFoldAct,
}

unit_selector!(NodeSpendAct {
    LinkedListAct = 0,
    ModifyCommitment = 1,
    RewardFoldAct = 2,
});

/// Spending selector of the commit fold validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoldOp {
    /// Absorbs the referenced nodes at `indices` (positions in the sorted reference inputs).
    FoldNodes {
        /// Reference input positions, in chain order.
        indices: Vec<u32>,
    },
    /// Destroys an accumulator that has not advanced yet, or a closed one when the reward fold
    /// takes over.
    Reclaim,
}

impl ToPlutusData for FoldOp {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            FoldOp::FoldNodes { indices } => {
                PlutusData::constr(0, vec![encode_indices(indices)])
            }
            FoldOp::Reclaim => PlutusData::constr(1, vec![]),
        }
    }
}

impl FromPlutusData for FoldOp {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        match data.as_constr()? {
            (0, [indices]) => Ok(FoldOp::FoldNodes {
                indices: decode_indices(indices)?,
            }),
            (1, []) => Ok(FoldOp::Reclaim),
            _ => Err(unexpected("FoldOp", data)),
        }
    }
}

/// Spending selector of the reward fold validator (and of its stake script for batches).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardFoldOp {
    /// Pays the nodes at `in_indices` (sorted input positions) into the outputs at
    /// `out_indices`.
    FoldNodes {
        /// Input positions of the nodes, in chain order.
        in_indices: Vec<u32>,
        /// Output positions of the rewritten nodes, pairwise with `in_indices`.
        out_indices: Vec<u32>,
    },
    /// Sends the remaining dust to the reclaim address and destroys the accumulator.
    Reclaim,
}

impl ToPlutusData for RewardFoldOp {
    fn to_plutus_data(&self) -> PlutusData {
        match self {
            RewardFoldOp::FoldNodes {
                in_indices,
                out_indices,
            } => PlutusData::constr(
                0,
                vec![encode_indices(in_indices), encode_indices(out_indices)],
            ),
            RewardFoldOp::Reclaim => PlutusData::constr(1, vec![]),
        }
    }
}

impl FromPlutusData for RewardFoldOp {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        match data.as_constr()? {
            (0, [ins, outs]) => Ok(RewardFoldOp::FoldNodes {
                in_indices: decode_indices(ins)?,
                out_indices: decode_indices(outs)?,
            }),
            (1, []) => Ok(RewardFoldOp::Reclaim),
            _ => Err(unexpected("RewardFoldOp", data)),
        }
    }
}

/// Minting selector of the commit fold token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FoldMintOp {
    /// Creates the accumulator.
    MintFold,
    /// Destroys the accumulator.
    BurnFold,
}

unit_selector!(FoldMintOp {
    MintFold = 0,
    BurnFold = 1,
});

/// Minting selector of the reward fold token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardFoldMintOp {
    /// Creates the accumulator.
    MintRewardFold,
    /// Destroys the accumulator.
    BurnRewardFold,
}

unit_selector!(RewardFoldMintOp {
    MintRewardFold = 0,
    BurnRewardFold = 1,
});

/// Minting selector of the reward pool token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardPoolMintOp {
    /// Creates the pool record.
    MintHolder,
    /// Destroys the pool record.
    BurnHolder,
}

unit_selector!(RewardPoolMintOp {
    MintHolder = 0,
    BurnHolder = 1,
});
