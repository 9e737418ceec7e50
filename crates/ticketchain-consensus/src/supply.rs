//! Coin supply estimate used to cap the ticket price.
//!
//! Always evaluated against `subsidy_v1`, whichever schedule is in force at
//! the height being estimated.

use crate::chain_params::ChainParams;
use crate::ratio::Ratio;
use crate::subsidy::epoch_subsidy_ratio;
use num_bigint::BigInt;
use num_traits::One;

/// Tenfold tail epochs included in the estimate.
pub const MAX_TAIL_EPOCHS: u64 = 64;

/// Estimated total coins in existence after the block at `height`.
///
/// Completed epochs are summed in closed form, the current epoch contributes
/// its blocks up to and including `height`, and the normal subsidies of
/// heights 0 and 1 are replaced by the block one ledger.
pub fn estimate_supply(params: &ChainParams, height: i64) -> i64 {
    if height <= 0 {
        return 0;
    }

    let schedule = &params.subsidy_v1;
    let interval = params.subsidy_reduction_interval;
    let epoch = (height / interval) as u64;

    let completed = completed_epochs_sum(params, epoch).mul_int(interval);
    let partial = epoch_subsidy_ratio(schedule, epoch).mul_int(1 + height % interval);
    let adjustment = Ratio::from_int(params.block_one_subsidy() - 2 * schedule.base_subsidy);

    completed.add(&partial).add(&adjustment).floor_i64()
}

/// Exact sum of the per-block subsidy over epochs `[0, epochs)`.
fn completed_epochs_sum(params: &ChainParams, epochs: u64) -> Ratio {
    let schedule = &params.subsidy_v1;
    let threshold = schedule.epoch_threshold;
    let geometric = epochs.min(threshold);

    let mut sum = Ratio::zero();
    if geometric > 0 {
        let b = BigInt::from(schedule.base_subsidy);
        let m = BigInt::from(schedule.mul_subsidy);
        let d = BigInt::from(schedule.div_subsidy);
        let t = BigInt::from(threshold);
        let n = geometric as u32;
        let big_n = BigInt::from(geometric);

        let d_n = d.pow(n);
        let m_n = m.pow(n);
        let m_n1 = m.pow(n - 1);
        let diff = &d - &m;

        // With q = m/d:
        //   sum(q^e)     = (d^n - m^n) / (d^(n-1) (d-m))
        //   sum(e * q^e) = m (d^n - n d m^(n-1) + (n-1) m^n) / (d^(n-1) (d-m)^2)
        // and the epochs sum to (B/T) (T sum(q^e) - sum(e q^e)).
        let s0_num = (&d_n - &m_n) * &diff;
        let s1_num = &m * (&d_n - &big_n * &d * &m_n1 + (&big_n - BigInt::one()) * &m_n);
        let num = b * (&t * s0_num - s1_num);
        let den = t * d.pow(n - 1) * &diff * &diff;
        sum = Ratio::new(num, den);
    }

    if epochs > threshold {
        let k = (epochs - threshold).min(MAX_TAIL_EPOCHS) as u32;
        // Tail epoch T + j - 1 pays C / 10^j, so k epochs pay C (10^k - 1) / (9 10^k).
        let last = epoch_subsidy_ratio(schedule, threshold - 1);
        let ten_k = BigInt::from(10).pow(k);
        let factor = Ratio::new(&ten_k - BigInt::one(), ten_k * 9);
        sum = sum.add(&last.scaled_by(&factor));
    }

    sum
}
