//! # ticketchain-consensus
//!
//! Consensus arithmetic for the ticketchain hybrid proof-of-work /
//! proof-of-stake chain.
//!
//! This crate provides:
//! - Compact target encoding
//! - Block subsidy schedule with a per-epoch cache
//! - Coin supply estimation
//! - Proof-of-work difficulty retargeting
//! - Ticket price retargeting and estimation, generic over ticket type
//!
//! ## Work Difficulty
//!
//! The target is recomputed every `work_diff_window_size` blocks from an
//! exponentially weighted average over `work_diff_windows` windows, in 64.32
//! fixed point. Test networks may drop to minimum difficulty after a gap.
//!
//! ## Stake Difficulty
//!
//! The ticket price follows the square of the relative pool size change,
//! bounded below by a minimum and above by the estimated coin supply divided
//! by the target pool size. Regular and AI tickets share the algorithm.

mod chain_params;
mod chain_view;
mod compact;
mod error;
mod hash;
mod header;
mod pow_difficulty;
mod ratio;
mod stake_difficulty;
mod subsidy;
mod supply;
mod ticket_kind;
mod transaction;

pub use chain_params::{
    ChainParams, ChainParamsConfig, ChainParamsError, Network, SubsidySchedule, TicketEconomics,
    TicketEconomicsConfig, TokenPayout, ATOMS_PER_COIN,
};
pub use chain_view::ChainView;
pub use compact::{big_to_compact, calc_work, compact_to_big};
pub use error::{ConsensusError, ConsensusResult};
pub use hash::{blake2b256, Hash};
pub use header::Header;
pub use pow_difficulty::WorkDifficultyCalculator;
pub use stake_difficulty::StakeDifficultyCalculator;
pub use subsidy::{
    epoch_subsidy, validate_block_one_payout, SubsidyCache, SubsidySplit, SubsidyVersion,
    PRECOMPUTED_EPOCHS,
};
pub use supply::{estimate_supply, MAX_TAIL_EPOCHS};
pub use ticket_kind::{AiTickets, RegularTickets, TicketKind, TicketType};
pub use transaction::{
    OutPoint, ScriptClass, Transaction, TxIn, TxOut, MAX_TICKET_INPUTS, NO_EXPIRY,
};
