//! Ticket price retargeting.
//!
//! ```text
//!                   cur_diff * cur_pool_size_all^2
//! next_diff = -----------------------------------------
//!             prev_pool_size_all * target_pool_size_all
//! ```
//!
//! clamped to `[minimum_stake_diff, estimated_supply / ticket_pool_size]`.
//! "Pool size all" counts live tickets plus those still maturing.

use crate::chain_params::{ChainParams, TicketEconomics};
use crate::chain_view::ChainView;
use crate::error::{ConsensusError, ConsensusResult};
use crate::supply::estimate_supply;
use crate::ticket_kind::TicketKind;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::marker::PhantomData;
use tracing::debug;

/// Stake difficulty calculator for ticket type `K`.
pub struct StakeDifficultyCalculator<'a, K: TicketKind> {
    params: &'a ChainParams,
    _kind: PhantomData<K>,
}

impl<'a, K: TicketKind> StakeDifficultyCalculator<'a, K> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self {
            params,
            _kind: PhantomData,
        }
    }

    fn economics(&self) -> &'a TicketEconomics {
        K::economics(self.params)
    }

    /// Apply the retarget formula and clamp the result.
    ///
    /// Both multiplications happen before either division. An empty previous
    /// pool leaves `cur_diff` unchanged.
    pub fn calc_next_stake_diff(
        &self,
        next_height: i64,
        cur_diff: i64,
        prev_pool_size_all: i64,
        cur_pool_size_all: i64,
    ) -> i64 {
        let econ = self.economics();
        let target_pool_size_all = econ.target_pool_size_all();
        if prev_pool_size_all <= 0 || target_pool_size_all <= 0 {
            return cur_diff;
        }

        let cur_all = BigInt::from(cur_pool_size_all);
        let mut next = BigInt::from(cur_diff) * &cur_all * &cur_all;
        next /= BigInt::from(prev_pool_size_all);
        next /= BigInt::from(target_pool_size_all);

        let maximum = estimate_supply(self.params, next_height) / econ.ticket_pool_size as i64;
        let mut next_diff = if next > BigInt::from(maximum) {
            maximum
        } else {
            next.to_i64().unwrap_or(maximum)
        };
        if next_diff < econ.minimum_stake_diff {
            next_diff = econ.minimum_stake_diff;
        }
        next_diff
    }

    /// Sum the purchases of `count` blocks starting at `start` and walking
    /// towards genesis.
    pub fn sum_purchased_tickets<V: ChainView + ?Sized>(
        &self,
        chain: &V,
        start: Option<V::Node>,
        count: i64,
    ) -> i64 {
        let mut total = 0i64;
        let mut node = start;
        let mut traversed = 0;
        while let Some(n) = node {
            if traversed >= count {
                break;
            }
            total += K::fresh_stake(chain.header(n)) as i64;
            node = chain.parent(n);
            traversed += 1;
        }
        total
    }

    /// Pool size plus immature tickets as seen by the block at `node`.
    fn pool_size_all<V: ChainView + ?Sized>(&self, chain: &V, node: Option<V::Node>) -> i64 {
        let maturity = self.economics().ticket_maturity as i64;
        let pool = node.map_or(0, |n| K::pool_size(chain.header(n)) as i64);
        pool + self.sum_purchased_tickets(chain, node, maturity)
    }

    /// Ticket price required for the block after `cur`.
    pub fn calc_next_required_stake_difficulty<V: ChainView + ?Sized>(
        &self,
        chain: &V,
        cur: Option<V::Node>,
    ) -> i64 {
        let econ = self.economics();
        let next_height = cur.map_or(0, |n| chain.height(n) + 1);
        let Some(cur) = cur.filter(|_| next_height >= econ.stake_diff_start_height) else {
            return econ.minimum_stake_diff;
        };

        let window = econ.stake_diff_window_size;
        let cur_diff = K::stake_difficulty(chain.header(cur));
        if next_height % window != 0 {
            return cur_diff;
        }

        // Heights are taken one block before each interval boundary since
        // the difficulty for a boundary is computed from its parent.
        let prev_retarget = chain.ancestor(cur, next_height - window - 1);
        let prev_pool_size_all = self.pool_size_all(chain, prev_retarget);
        if prev_pool_size_all == 0 {
            return cur_diff;
        }

        let cur_pool_size_all = self.pool_size_all(chain, Some(cur));
        let next =
            self.calc_next_stake_diff(next_height, cur_diff, prev_pool_size_all, cur_pool_size_all);
        debug!(
            ticket_type = %K::TICKET_TYPE,
            height = next_height,
            prev_pool_size_all,
            cur_pool_size_all,
            cur_diff,
            next_diff = next,
            "Stake difficulty retarget"
        );
        next
    }

    /// Project the ticket price of the next retarget.
    ///
    /// Assumes `new_tickets` more purchases before the retarget, or the most
    /// the per-block cap allows when `use_max` is set.
    pub fn estimate_next_stake_difficulty<V: ChainView + ?Sized>(
        &self,
        chain: &V,
        cur: Option<V::Node>,
        new_tickets: i64,
        use_max: bool,
    ) -> ConsensusResult<i64> {
        let econ = self.economics();
        let cur_height = cur.map_or(0, |n| chain.height(n));
        let maturity = econ.ticket_maturity as i64;
        let window = econ.stake_diff_window_size;
        let blocks_until_retarget = window - cur_height % window;
        let next_retarget_height = cur_height + blocks_until_retarget;

        if window > maturity {
            return Err(ConsensusError::EstimatorPrecondition(format!(
                "stake difficulty window {} exceeds ticket maturity {}",
                window, maturity
            )));
        }

        let max_per_block = econ.max_fresh_stake_per_block as i64;
        let max_remaining = (blocks_until_retarget - 1) * max_per_block;
        let new_tickets = if use_max { max_remaining } else { new_tickets };
        if new_tickets > max_remaining {
            return Err(ConsensusError::TicketsExceedMaximum {
                requested: new_tickets,
                maximum: max_remaining,
            });
        }

        let Some(cur) = cur.filter(|_| next_retarget_height >= econ.stake_diff_start_height) else {
            return Ok(econ.minimum_stake_diff);
        };

        let prev_retarget = chain.ancestor(cur, next_retarget_height - window - 1);
        let prev_pool_size_all = self.pool_size_all(chain, prev_retarget);
        let cur_diff = K::stake_difficulty(chain.header(cur));
        if prev_pool_size_all == 0 {
            return Ok(cur_diff);
        }

        // Known purchases that will still be immature at the retarget, then
        // the estimated ones.
        let mut remaining_immature = 0;
        let next_maturity_floor = next_retarget_height - maturity - 1;
        if cur_height > next_maturity_floor {
            remaining_immature =
                self.sum_purchased_tickets(chain, Some(cur), cur_height - next_maturity_floor);
        }
        remaining_immature += new_tickets.min(maturity * max_per_block);

        // Known purchases maturing before the retarget. Header pool sizes
        // exclude tickets maturing in that very block, so stop one short of
        // the floor.
        let final_maturing_height = (next_maturity_floor - 1).min(cur_height);
        let final_maturing = chain.ancestor(cur, final_maturing_height);
        let first_maturing_height = cur_height - maturity;
        let maturing = self.sum_purchased_tickets(
            chain,
            final_maturing,
            final_maturing_height - first_maturing_height + 1,
        );

        let svh = econ.stake_validation_height;
        let mut pending_votes = 0;
        if next_retarget_height > svh {
            let voting_blocks = if cur_height < svh {
                next_retarget_height - svh
            } else {
                blocks_until_retarget - 1
            };
            pending_votes = voting_blocks * econ.tickets_per_block as i64;
        }

        let cur_pool = K::pool_size(chain.header(cur)) as i64;
        let estimated_pool = cur_pool + maturing - pending_votes;
        let estimated_pool_all = estimated_pool + remaining_immature;

        let estimate = self.calc_next_stake_diff(
            next_retarget_height,
            cur_diff,
            prev_pool_size_all,
            estimated_pool_all,
        );
        debug!(
            ticket_type = %K::TICKET_TYPE,
            height = cur_height,
            next_retarget_height,
            new_tickets,
            estimated_pool_all,
            estimate,
            "Stake difficulty estimate"
        );
        Ok(estimate)
    }
}
