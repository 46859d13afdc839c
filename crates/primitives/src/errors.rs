//! Error taxonomy shared by every campaign operation.
//!
//! Every operation returns a [`CampaignResult`] instead of panicking. The orchestrator inspects
//! [`CampaignError::kind`] to decide whether a failure is worth another attempt.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding ledger records or user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended before a complete item could be read.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The input contained bytes after the last complete item.
    #[error("{0} trailing bytes after decoded item")]
    TrailingBytes(usize),

    /// A CBOR construct that plutus data never uses.
    #[error("unsupported cbor: {0}")]
    UnsupportedCbor(String),

    /// The plutus data had a different shape than the record being decoded.
    #[error("unexpected plutus data shape: expected {expected}, got {got}")]
    UnexpectedShape {
        /// What the decoder was looking for.
        expected: String,
        /// What it found instead.
        got: String,
    },

    /// A fixed-size field had the wrong length.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        got: usize,
    },

    /// A number did not fit the target integer type.
    #[error("integer {0} out of range")]
    IntegerOutOfRange(i128),

    /// A hex string could not be parsed.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// A textual identifier could not be parsed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
}

/// Coarse classification of a [`CampaignError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or invalid configuration. Fatal.
    Configuration,
    /// The operation is not valid in the current phase or time window.
    Phase,
    /// An expected record is not on the ledger.
    NotFound,
    /// The wallet cannot pay for the transaction. Fatal.
    InsufficientFunds,
    /// The ledger refused the transaction, usually because an input was already consumed.
    LedgerRejection,
    /// The key already has a node (or a singleton already exists).
    DuplicateKey,
    /// The stake is below the campaign minimum.
    BelowMinimumStake,
    /// The operation overlaps with a different phase's operation (e.g. `remove` vs `claim`).
    PhaseOverlap,
    /// The requested change would not change anything.
    NoChange,
    /// A fold batch is not a contiguous run starting at the accumulator pointer.
    InvalidBatch,
    /// A record could not be decoded.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind_str = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Phase => "PhaseError",
            ErrorKind::NotFound => "NotFoundError",
            ErrorKind::InsufficientFunds => "InsufficientFundsError",
            ErrorKind::LedgerRejection => "LedgerRejectionError",
            ErrorKind::DuplicateKey => "DuplicateKeyError",
            ErrorKind::BelowMinimumStake => "BelowMinimumStakeError",
            ErrorKind::PhaseOverlap => "PhaseOverlapError",
            ErrorKind::NoChange => "NoChangeError",
            ErrorKind::InvalidBatch => "InvalidBatchError",
            ErrorKind::Decode => "DecodeError",
        };
        write!(f, "{kind_str}")
    }
}

/// Unified error type for all campaign operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CampaignError {
    /// A configuration record or parameter is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation is outside its valid time window or relies on a stale phase.
    #[error("phase error: {0}")]
    Phase(String),

    /// An expected node, accumulator or pool is not on the ledger.
    #[error("not found: {0}")]
    NotFound(String),

    /// The signer cannot fund the transaction.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The ledger rejected the transaction (typically a lost race for an input).
    #[error("ledger rejected transaction: {0}")]
    LedgerRejection(String),

    /// The key already exists in the set.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The stake does not meet the configured minimum.
    #[error("stake {amount} is below the minimum of {minimum}")]
    BelowMinimumStake {
        /// The offered stake.
        amount: u64,
        /// The campaign minimum.
        minimum: u64,
    },

    /// The operation is not allowed because another phase's operation applies.
    #[error("phase overlap: {0}")]
    PhaseOverlap(String),

    /// The requested change is a no-op.
    #[error("no change: {0}")]
    NoChange(String),

    /// A fold batch is out of order, has a gap or exceeds the batch size.
    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    /// A ledger record could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl CampaignError {
    /// Returns the coarse classification of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            CampaignError::Configuration(_) => ErrorKind::Configuration,
            CampaignError::Phase(_) => ErrorKind::Phase,
            CampaignError::NotFound(_) => ErrorKind::NotFound,
            CampaignError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            CampaignError::LedgerRejection(_) => ErrorKind::LedgerRejection,
            CampaignError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            CampaignError::BelowMinimumStake { .. } => ErrorKind::BelowMinimumStake,
            CampaignError::PhaseOverlap(_) => ErrorKind::PhaseOverlap,
            CampaignError::NoChange(_) => ErrorKind::NoChange,
            CampaignError::InvalidBatch(_) => ErrorKind::InvalidBatch,
            CampaignError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Whether re-deriving the campaign state and trying again can make the operation succeed.
    ///
    /// `NotFound` counts as recoverable: a missing accumulator is frequently evidence that an
    /// earlier, unconfirmed-at-the-time attempt went through, which only a fresh look at the
    /// ledger can tell.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Phase
                | ErrorKind::NotFound
                | ErrorKind::LedgerRejection
                | ErrorKind::DuplicateKey
                | ErrorKind::InvalidBatch
        )
    }
}

/// The result type for all campaign operations.
pub type CampaignResult<T> = Result<T, CampaignError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_are_not_recoverable() {
        assert!(!CampaignError::Configuration("missing config".into()).is_recoverable());
        assert!(!CampaignError::InsufficientFunds("empty wallet".into()).is_recoverable());
        assert!(!CampaignError::Decode(DecodeError::UnexpectedEof).is_recoverable());
    }

    #[test]
    fn test_race_and_stale_phase_errors_are_recoverable() {
        assert!(CampaignError::LedgerRejection("input spent".into()).is_recoverable());
        assert!(CampaignError::Phase("too early".into()).is_recoverable());
        assert!(CampaignError::NotFound("commit fold".into()).is_recoverable());
    }

    #[test]
    fn test_kind_display_uses_taxonomy_names() {
        let err = CampaignError::BelowMinimumStake {
            amount: 1,
            minimum: 2,
        };
        assert_eq!(err.kind().to_string(), "BelowMinimumStakeError");
        assert_eq!(err.to_string(), "stake 1 is below the minimum of 2");
    }
}
