//! Amounts and limits of the campaign protocol.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    default::{
        COMMIT_FOLD_BATCH, FOLDING_FEE, NODE_FLOOR, RECORD_FLOOR, REWARD_FOLD_BATCH,
        VALIDITY_TOLERANCE,
    },
    errors::ParamsError,
};

/// The protocol parameters shared by every party of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    /// Native coin (lovelace) locked in every node while staking.
    pub node_floor: u64,

    /// Part of the node floor released to the reward fold operator when the node is paid.
    ///
    /// A paid node therefore holds exactly [`Self::reduced_floor`] lovelace, which is how a node
    /// that received its reward is told apart from one that did not.
    pub folding_fee: u64,

    /// Native coin locked in fold accumulators, the reward pool and the config record.
    pub record_floor: u64,

    /// Half-width of the validity window attached to time-bounded transactions.
    ///
    /// Must exceed the worst-case clock skew between building and settling a transaction.
    pub validity_tolerance: Duration,

    /// Maximum number of nodes absorbed by a commit fold advance.
    pub commit_fold_batch_size: usize,

    /// Maximum number of nodes paid by a reward fold advance.
    pub reward_fold_batch_size: usize,
}

impl ProtocolParams {
    /// Lovelace held by a node after the reward fold paid it.
    pub const fn reduced_floor(&self) -> u64 {
        self.node_floor.saturating_sub(self.folding_fee)
    }

    /// Checks that the parameters make sense together.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.folding_fee == 0 || self.folding_fee >= self.node_floor {
            return Err(ParamsError::FeeExceedsFloor {
                fee: self.folding_fee,
                floor: self.node_floor,
            });
        }
        if self.commit_fold_batch_size == 0 {
            return Err(ParamsError::ZeroBatchSize("commit fold"));
        }
        if self.reward_fold_batch_size == 0 {
            return Err(ParamsError::ZeroBatchSize("reward fold"));
        }
        Ok(())
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            node_floor: NODE_FLOOR,
            folding_fee: FOLDING_FEE,
            record_floor: RECORD_FLOOR,
            validity_tolerance: VALIDITY_TOLERANCE,
            commit_fold_batch_size: COMMIT_FOLD_BATCH,
            reward_fold_batch_size: REWARD_FOLD_BATCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_params_serde() {
        let params = ProtocolParams::default();
        let serialized = toml::to_string(&params).unwrap();
        let deserialized: ProtocolParams = toml::from_str(&serialized).unwrap();
        assert_eq!(params, deserialized);

        let params_toml = r#"
            node_floor = 3000000
            folding_fee = 1000000
            validity_tolerance = { secs = 60, nanos = 0 }
        "#;
        let parsed = toml::from_str::<ProtocolParams>(params_toml)
            .expect("must be able to deserialize partial ProtocolParams from toml");
        assert_eq!(parsed.validity_tolerance, Duration::from_secs(60));
        assert_eq!(parsed.commit_fold_batch_size, 50);
        assert_eq!(parsed.reward_fold_batch_size, 25);
    }

    #[test]
    fn test_reduced_floor_is_two_ada_by_default() {
        assert_eq!(ProtocolParams::default().reduced_floor(), 2_000_000);
    }

    #[test]
    fn test_validate_rejects_fee_at_floor() {
        let params = ProtocolParams {
            folding_fee: 3_000_000,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamsError::FeeExceedsFloor { .. })
        ));

        let params = ProtocolParams {
            reward_fold_batch_size: 0,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ParamsError::ZeroBatchSize("reward fold"))
        );
    }
}
