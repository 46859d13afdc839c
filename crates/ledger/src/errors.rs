//! Errors reported by a ledger gateway.

use campaign_primitives::errors::{CampaignError, DecodeError};
use thiserror::Error;

/// Failures of the external ledger gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The ledger refused the transaction, e.g. because an input is already spent or the
    /// validity window does not contain the current time.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The signer's wallet cannot balance the transaction.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// A record returned by the ledger could not be decoded.
    #[error("malformed ledger data: {0}")]
    Malformed(#[from] DecodeError),
}

impl From<GatewayError> for CampaignError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(msg) => CampaignError::LedgerRejection(msg),
            GatewayError::InsufficientFunds(msg) => CampaignError::InsufficientFunds(msg),
            // An unreachable ledger looks like a lost race from the caller's point of view: the
            // same action may succeed once the state is fetched again.
            GatewayError::Unavailable(msg) => {
                CampaignError::LedgerRejection(format!("ledger unavailable: {msg}"))
            }
            GatewayError::Malformed(err) => CampaignError::Decode(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use campaign_primitives::errors::ErrorKind;

    use super::*;

    #[test]
    fn test_gateway_errors_map_to_taxonomy() {
        let cases = [
            (GatewayError::Rejected("spent".into()), ErrorKind::LedgerRejection),
            (
                GatewayError::InsufficientFunds("empty".into()),
                ErrorKind::InsufficientFunds,
            ),
            (
                GatewayError::Unavailable("timeout".into()),
                ErrorKind::LedgerRejection,
            ),
            (
                GatewayError::Malformed(DecodeError::UnexpectedEof),
                ErrorKind::Decode,
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(CampaignError::from(err).kind(), kind);
        }
    }
}
