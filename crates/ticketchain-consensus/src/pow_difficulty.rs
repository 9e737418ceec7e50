//! Proof-of-work difficulty retargeting.
//!
//! The target is recomputed once per `work_diff_window_size` blocks from the
//! last `work_diff_windows` windows. Each window contributes the ratio of its
//! actual to its target timespan as a 64.32 fixed-point number, and more
//! recent windows are weighted exponentially higher via `work_diff_alpha`.

use crate::chain_params::ChainParams;
use crate::chain_view::ChainView;
use crate::compact::{big_to_compact, compact_to_big};
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed};
use tracing::{debug, trace};

/// Work difficulty calculator.
///
/// Uses ChainParams for network-specific values.
pub struct WorkDifficultyCalculator<'a> {
    params: &'a ChainParams,
}

impl<'a> WorkDifficultyCalculator<'a> {
    /// Create a new calculator with the given chain parameters.
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    /// Compact target required for the block after `cur`.
    ///
    /// # Arguments
    /// * `chain` - Block tree containing `cur` and its ancestors
    /// * `cur` - Current tip, `None` when the next block is genesis
    /// * `new_block_time` - Timestamp of the block being built or validated
    pub fn calc_next_required_difficulty<V: ChainView + ?Sized>(
        &self,
        chain: &V,
        cur: Option<V::Node>,
        new_block_time: i64,
    ) -> u32 {
        let params = self.params;
        let Some(cur) = cur else {
            return params.pow_limit_bits;
        };

        let cur_header = chain.header(cur);
        let old_bits = cur_header.bits;
        let next_height = chain.height(cur) + 1;

        if next_height % params.work_diff_window_size != 0 {
            if !params.reduce_min_difficulty {
                return old_bits;
            }

            // Test networks allow the target to rise once a block is overdue,
            // doubling for every further target interval.
            let allow_min_time = cur_header.timestamp + params.min_diff_reduction_time;
            if new_block_time > allow_min_time {
                let time_passed =
                    new_block_time - cur_header.timestamp - params.min_diff_reduction_time;
                let shifts = time_passed / params.target_time_per_block + 1;
                let old_target = compact_to_big(old_bits);
                let mut new_target = if shifts < 256 {
                    old_target << shifts as usize
                } else {
                    BigInt::one() << 256usize
                };
                if new_target > params.pow_limit {
                    new_target = params.pow_limit.clone();
                }
                let bits = big_to_compact(&new_target);
                debug!(
                    height = next_height,
                    shifts,
                    nbits = format!("0x{:08x}", bits),
                    "Minimum difficulty reduction"
                );
                return bits;
            }

            return self.find_prev_test_net_difficulty(chain, Some(cur));
        }

        let next = self.retarget(chain, cur);
        let bits = big_to_compact(&next);
        debug!(
            height = next_height,
            old_nbits = format!("0x{:08x}", old_bits),
            nbits = format!("0x{:08x}", bits),
            "Work difficulty retarget"
        );
        bits
    }

    /// Weighted window retarget at a window boundary.
    fn retarget<V: ChainView + ?Sized>(&self, chain: &V, cur: V::Node) -> BigInt {
        let params = self.params;
        let old_target = compact_to_big(chain.header(cur).bits);
        let raf = BigInt::from(params.retarget_adjustment_factor);
        let min_target = &old_target / &raf;
        let max_target = &old_target * &raf;

        let windows = params.work_diff_windows;
        let window_size = params.work_diff_window_size;
        let alpha = params.work_diff_alpha;
        let target_timespan = BigInt::from(params.target_timespan());
        let nodes_to_traverse = window_size * windows;

        let mut weighted_sum = BigInt::from(0);
        let mut weights: u64 = 0;
        let mut window_period: i64 = 0;
        let mut old_node = cur;
        let mut recent_time = chain.header(cur).timestamp;

        let mut i: i64 = 0;
        loop {
            if i % window_size == 0 && i != 0 {
                let older_time = chain.header(old_node).timestamp;
                // No change assumed for windows reaching back to genesis.
                let time_difference = if chain.height(old_node) == 0 {
                    params.target_timespan()
                } else {
                    recent_time - older_time
                };

                let shift = ((windows - window_period) * alpha) as usize;
                let padded = BigInt::from(time_difference) << 32usize;
                let window_adjusted = floor_div(&padded, &target_timespan) << shift;
                trace!(
                    window = window_period,
                    time_difference,
                    adjusted = %window_adjusted,
                    "Difficulty window"
                );
                weighted_sum += window_adjusted;
                weights += 1u64 << shift;
                window_period += 1;
                recent_time = older_time;
            }

            if i == nodes_to_traverse {
                break;
            }
            if let Some(parent) = chain.parent(old_node) {
                old_node = parent;
            }
            i += 1;
        }

        let weighted_avg = floor_div(&weighted_sum, &BigInt::from(weights));
        let mut next = (weighted_avg * &old_target) >> 32usize;

        if !old_target.is_positive() || !next.is_positive() {
            next = params.pow_limit.clone();
        } else if next > max_target {
            next = max_target;
        } else if next < min_target {
            next = min_target;
        }

        if next > params.pow_limit {
            next = params.pow_limit.clone();
        }
        next
    }

    /// Bits of the most recent block that was not mined under the
    /// minimum-difficulty rule.
    ///
    /// Walks back from `start` while the block carries the limit bits and is
    /// not on a window boundary.
    pub fn find_prev_test_net_difficulty<V: ChainView + ?Sized>(
        &self,
        chain: &V,
        start: Option<V::Node>,
    ) -> u32 {
        let params = self.params;
        let mut node = start;
        while let Some(n) = node {
            if chain.height(n) % params.work_diff_window_size == 0
                || chain.header(n).bits != params.pow_limit_bits
            {
                break;
            }
            node = chain.parent(n);
        }
        node.map(|n| chain.header(n).bits)
            .unwrap_or(params.pow_limit_bits)
    }
}

/// Division rounding toward negative infinity for a positive divisor.
fn floor_div(a: &BigInt, b: &BigInt) -> BigInt {
    let q = a / b;
    if (a % b).sign() == Sign::Minus {
        q - 1
    } else {
        q
    }
}
