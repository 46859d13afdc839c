//! Protocol constants that have to agree with the authorization scripts.

/// Name of the membership token carried by the head sentinel; participant tokens extend it with
/// the participant key.
pub const NODE_TOKEN_PREFIX: &[u8] = b"FSN";

/// Name of the token that marks the commit fold accumulator.
pub const COMMIT_FOLD_TOKEN_NAME: &[u8] = b"CFold";

/// Name of the token that marks the reward fold accumulator.
pub const REWARD_FOLD_TOKEN_NAME: &[u8] = b"RFold";

/// Name of the token that marks the reward pool record.
pub const REWARD_POOL_TOKEN_NAME: &[u8] = b"RTHolder";

/// Maximum number of nodes absorbed by one commit fold advance.
pub const COMMIT_FOLD_BATCH_SIZE: usize = 50;

/// Maximum number of nodes processed by one reward fold advance.
pub const REWARD_FOLD_BATCH_SIZE: usize = 25;

/// Number of lovelace in one ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Fraction of the stake retained as penalty when a participant leaves during the freeze:
/// `ceil(stake / PENALTY_DENOMINATOR)`.
pub const PENALTY_DENOMINATOR: u64 = 4;
