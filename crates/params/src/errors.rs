//! Errors for the campaign parameters.

use thiserror::Error;

/// Error while loading or validating campaign parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    /// The params document could not be parsed.
    #[error("could not parse params: {0}")]
    Parse(String),

    /// The folding fee must leave a non-zero reduced floor.
    #[error("folding fee {fee} must be smaller than the node floor {floor}")]
    FeeExceedsFloor {
        /// The configured folding fee.
        fee: u64,
        /// The configured node floor.
        floor: u64,
    },

    /// A batch size of zero would never make progress.
    #[error("{0} batch size must be positive")]
    ZeroBatchSize(&'static str),
}
