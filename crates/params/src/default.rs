//! Default values for the campaign protocol.

use std::time::Duration;

use campaign_primitives::constants::{
    COMMIT_FOLD_BATCH_SIZE, LOVELACE_PER_ADA, REWARD_FOLD_BATCH_SIZE,
};

/// Default native coin locked in every node while staking.
pub(crate) const NODE_FLOOR: u64 = 3 * LOVELACE_PER_ADA;

/// Default part of the node floor paid to the reward fold operator per node.
pub(crate) const FOLDING_FEE: u64 = LOVELACE_PER_ADA;

/// Default native coin locked in fold accumulators, the reward pool and the config record.
pub(crate) const RECORD_FLOOR: u64 = 2 * LOVELACE_PER_ADA;

/// Default half-width of the validity window around "now".
pub(crate) const VALIDITY_TOLERANCE: Duration = Duration::from_secs(5 * 60);

/// Default number of nodes absorbed by a commit fold advance.
pub(crate) const COMMIT_FOLD_BATCH: usize = COMMIT_FOLD_BATCH_SIZE;

/// Default number of nodes paid by a reward fold advance.
pub(crate) const REWARD_FOLD_BATCH: usize = REWARD_FOLD_BATCH_SIZE;
