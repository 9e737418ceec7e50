//! Block subsidy schedule and its per-epoch cache.
//!
//! The subsidy of reduction epoch `e` under a schedule with base `B`,
//! decay `m/d` and threshold `T` is
//!
//! ```text
//! e <  T:  floor(B * (m/d)^e * (T - e) / T)
//! e >= T:  floor(B * (m/d)^(T-1) / (T * 10^(e-T+1)))
//! ```
//!
//! evaluated exactly on big integers.

use crate::chain_params::{ChainParams, SubsidySchedule};
use crate::error::{ConsensusError, ConsensusResult};
use crate::ratio::Ratio;
use crate::transaction::{Transaction, NO_EXPIRY};
use num_bigint::BigInt;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Epochs of each schedule computed when the cache is built.
pub const PRECOMPUTED_EPOCHS: u64 = 8;

/// Tail epochs after which every schedule pays nothing; the base subsidy is
/// below 10^19.
const TAIL_ZERO_AFTER: u64 = 19;

/// Which subsidy parameter set is in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubsidyVersion {
    V1,
    V2,
}

/// Per-block subsidy broken down by recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubsidySplit {
    /// Paid to the miner.
    pub work: i64,
    /// Paid to each voter.
    pub vote: i64,
    /// Paid to the treasury.
    pub treasury: i64,
}

/// Exact subsidy of `epoch` under `schedule` as a rational.
pub(crate) fn epoch_subsidy_ratio(schedule: &SubsidySchedule, epoch: u64) -> Ratio {
    let base = BigInt::from(schedule.base_subsidy);
    let mul = BigInt::from(schedule.mul_subsidy);
    let div = BigInt::from(schedule.div_subsidy);
    let threshold = schedule.epoch_threshold;

    if epoch < threshold {
        let e = epoch as u32;
        let num = base * mul.pow(e) * BigInt::from(threshold - epoch);
        let den = div.pow(e) * BigInt::from(threshold);
        return Ratio::new(num, den);
    }

    let tail = epoch - threshold + 1;
    if tail > TAIL_ZERO_AFTER {
        return Ratio::zero();
    }
    let last = (threshold - 1) as u32;
    let num = base * mul.pow(last);
    let den = div.pow(last) * BigInt::from(threshold) * BigInt::from(10).pow(tail as u32);
    Ratio::new(num, den)
}

/// Subsidy of `epoch` under `schedule` in atoms.
pub fn epoch_subsidy(schedule: &SubsidySchedule, epoch: u64) -> i64 {
    epoch_subsidy_ratio(schedule, epoch).floor_i64()
}

/// Memoizing subsidy calculator.
///
/// Values are keyed by `(version, epoch)`; the lock only guards the map, the
/// arithmetic runs outside it.
pub struct SubsidyCache {
    params: Arc<ChainParams>,
    cache: RwLock<HashMap<(SubsidyVersion, u64), i64>>,
}

impl SubsidyCache {
    /// Build a cache with the first [`PRECOMPUTED_EPOCHS`] epochs of both
    /// schedules filled in.
    pub fn new(params: Arc<ChainParams>) -> Self {
        let mut cache = HashMap::with_capacity(2 * PRECOMPUTED_EPOCHS as usize);
        for epoch in 0..PRECOMPUTED_EPOCHS {
            cache.insert(
                (SubsidyVersion::V1, epoch),
                epoch_subsidy(&params.subsidy_v1, epoch),
            );
            cache.insert(
                (SubsidyVersion::V2, epoch),
                epoch_subsidy(&params.subsidy_v2, epoch),
            );
        }
        Self {
            params,
            cache: RwLock::new(cache),
        }
    }

    pub fn params(&self) -> &ChainParams {
        &self.params
    }

    /// Number of memoized epochs.
    pub fn cached_epochs(&self) -> usize {
        self.cache.read().len()
    }

    /// Schedule in force at `height`.
    pub fn version_at(&self, height: i64) -> SubsidyVersion {
        match self.params.subsidy_v2_activation_height {
            Some(activation) if height >= activation => SubsidyVersion::V2,
            _ => SubsidyVersion::V1,
        }
    }

    fn schedule(&self, version: SubsidyVersion) -> &SubsidySchedule {
        match version {
            SubsidyVersion::V1 => &self.params.subsidy_v1,
            SubsidyVersion::V2 => &self.params.subsidy_v2,
        }
    }

    fn cached_epoch_subsidy(&self, version: SubsidyVersion, epoch: u64) -> i64 {
        if let Some(value) = self.cache.read().get(&(version, epoch)) {
            return *value;
        }

        let value = epoch_subsidy(self.schedule(version), epoch);
        trace!(?version, epoch, value, "Subsidy cache fill");
        *self.cache.write().entry((version, epoch)).or_insert(value)
    }

    /// Total subsidy of the block at `height`.
    ///
    /// Genesis pays nothing and block one pays the hard-coded ledger.
    pub fn block_subsidy(&self, height: i64) -> i64 {
        if height <= 0 {
            return 0;
        }
        if height == 1 {
            return self.params.block_one_subsidy();
        }
        let epoch = (height / self.params.subsidy_reduction_interval) as u64;
        self.cached_epoch_subsidy(self.version_at(height), epoch)
    }

    /// Miner share of the subsidy at `height` for a block with `voters` votes.
    pub fn work_subsidy(&self, height: i64, voters: u16) -> i64 {
        let params = &*self.params;
        let subsidy = scale(
            self.block_subsidy(height),
            params.work_reward_proportion as i64,
            params.total_subsidy_proportions(),
        );

        // Voting is not enforced before stake validation height.
        if height < params.tickets.stake_validation_height {
            return subsidy;
        }
        if voters == 0 {
            return 0;
        }
        scale(subsidy, voters as i64, params.tickets.tickets_per_block as i64)
    }

    /// Subsidy paid to each individual vote at `height`.
    pub fn vote_subsidy(&self, height: i64) -> i64 {
        let params = &*self.params;
        scale(
            self.block_subsidy(height),
            params.stake_reward_proportion as i64,
            params.total_subsidy_proportions() * params.tickets.tickets_per_block as i64,
        )
    }

    /// Treasury share of the subsidy at `height` for a block with `voters`
    /// votes.
    pub fn treasury_subsidy(&self, height: i64, voters: u16) -> i64 {
        let params = &*self.params;
        if params.block_tax_proportion == 0 {
            return 0;
        }
        let subsidy = scale(
            self.block_subsidy(height),
            params.block_tax_proportion as i64,
            params.total_subsidy_proportions(),
        );

        let voters = if height < params.tickets.stake_validation_height {
            params.tickets.tickets_per_block
        } else {
            voters
        };
        if voters == 0 {
            return 0;
        }
        scale(subsidy, voters as i64, params.tickets.tickets_per_block as i64)
    }

    /// Work, per-vote and treasury subsidy of a block.
    pub fn split(&self, height: i64, voters: u16) -> SubsidySplit {
        SubsidySplit {
            work: self.work_subsidy(height, voters),
            vote: self.vote_subsidy(height),
            treasury: self.treasury_subsidy(height, voters),
        }
    }

    /// Check that the block one coinbase pays exactly the hard-coded ledger.
    pub fn validate_block_one_payout(&self, tx: &Transaction) -> ConsensusResult<()> {
        validate_block_one_payout(tx, &self.params)
    }
}

/// `value * mul / div` with a wide intermediate.
fn scale(value: i64, mul: i64, div: i64) -> i64 {
    if div == 0 {
        return 0;
    }
    (value as i128 * mul as i128 / div as i128) as i64
}

/// Check that `tx`, the coinbase of block one, pays exactly the ledger in
/// `params`.
pub fn validate_block_one_payout(tx: &Transaction, params: &ChainParams) -> ConsensusResult<()> {
    if tx.lock_time != 0 {
        return Err(ConsensusError::BlockOnePayout(format!(
            "lock time must be zero, got {}",
            tx.lock_time
        )));
    }
    if tx.expiry != NO_EXPIRY {
        return Err(ConsensusError::BlockOnePayout(format!(
            "expiry must be {}, got {}",
            NO_EXPIRY, tx.expiry
        )));
    }

    let ledger = &params.block_one_ledger;
    if tx.outputs.len() != ledger.len() {
        return Err(ConsensusError::BlockOnePayout(format!(
            "expected {} outputs, got {}",
            ledger.len(),
            tx.outputs.len()
        )));
    }

    for (i, (output, payout)) in tx.outputs.iter().zip(ledger).enumerate() {
        if output.version != 0 {
            return Err(ConsensusError::BlockOnePayout(format!(
                "output {} has script version {}, expected 0",
                i, output.version
            )));
        }
        if output.addresses.len() != 1 {
            return Err(ConsensusError::BlockOnePayout(format!(
                "output {} pays {} addresses, expected exactly one",
                i,
                output.addresses.len()
            )));
        }
        if output.addresses[0] != payout.address {
            return Err(ConsensusError::BlockOnePayout(format!(
                "output {} pays {}, expected {}",
                i, output.addresses[0], payout.address
            )));
        }
        if output.value != payout.amount {
            return Err(ConsensusError::BlockOnePayout(format!(
                "output {} pays {} atoms, expected {}",
                i, output.value, payout.amount
            )));
        }
    }
    Ok(())
}
