//! Error types for ticket pool state.

use thiserror::Error;

/// State errors.
#[derive(Error, Debug)]
pub enum StateError {
    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] ticketchain_storage::StorageError),

    /// Consensus error.
    #[error("Consensus error: {0}")]
    Consensus(#[from] ticketchain_consensus::ConsensusError),

    /// Block not found.
    #[error("Block not found: {0}")]
    BlockNotFound(String),

    /// Block rejected by the index.
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// Undo data or matured tickets unavailable in memory and on disk.
    #[error("Missing stake data: {0}")]
    MissingStakeData(String),

    /// A ticket pool transition broke a stake rule.
    #[error("Stake rule violation: {0}")]
    StakeRule(String),

    /// Internal bookkeeping is inconsistent. Indicates a bug, not bad input.
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StateError {
    /// Whether this error signals broken internal invariants.
    pub fn is_assertion(&self) -> bool {
        matches!(self, StateError::Assertion(_))
    }
}

/// Result type for state operations.
pub type StateResult<T> = Result<T, StateError>;
