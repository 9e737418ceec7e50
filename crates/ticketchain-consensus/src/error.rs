//! Error types for consensus computations.

use thiserror::Error;

/// Consensus errors.
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// A block the computation depends on is not reachable from the tree.
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    /// The stake difficulty estimator cannot run with the configured
    /// parameters.
    #[error("Estimator precondition violated: {0}")]
    EstimatorPrecondition(String),

    /// More tickets were requested than can still be bought before the next
    /// retarget.
    #[error("Requested {requested} new tickets, exceeds maximum remaining {maximum}")]
    TicketsExceedMaximum { requested: i64, maximum: i64 },

    /// Block one coinbase does not match the hard-coded ledger.
    #[error("Invalid block one payout: {0}")]
    BlockOnePayout(String),

    /// Invalid chain parameters.
    #[error(transparent)]
    ChainParams(#[from] crate::chain_params::ChainParamsError),
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
