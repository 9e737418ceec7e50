//! Property-based tests using proptest.

use num_bigint::BigInt;
use proptest::prelude::*;
use ticketchain_consensus::{
    big_to_compact, compact_to_big, ChainParams, Header, RegularTickets,
    StakeDifficultyCalculator, WorkDifficultyCalculator,
};
use ticketchain_state::{find_ticket_idxs, Hash256Prng};
use ticketchain_consensus::Hash;
use std::collections::HashSet;

/// Compact values in normal form: non-zero leading mantissa byte, sign bit
/// clear and an exponent that leaves no truncated bytes.
fn arb_normalized_bits() -> impl Strategy<Value = u32> {
    (3u32..=0x20, 0x01u32..=0x7f, 0u32..=0xffff)
        .prop_map(|(exponent, lead, rest)| (exponent << 24) | (lead << 16) | rest)
}

fn arb_stake_params() -> impl Strategy<Value = (i64, i64, i64, i64)> {
    (0i64..200_000, 1i64..50_000_000_000, 1i64..40_000, 0i64..40_000)
}

proptest! {
    #[test]
    fn prop_normalized_compact_round_trip(bits in arb_normalized_bits()) {
        prop_assert_eq!(big_to_compact(&compact_to_big(bits)), bits);
    }

    #[test]
    fn prop_compact_never_grows_target(value in 1u128..) {
        let target = BigInt::from(value);
        prop_assert!(compact_to_big(big_to_compact(&target)) <= target);
    }

    #[test]
    fn prop_work_difficulty_within_limit(
        spacings in prop::collection::vec(0i64..2_000, 40),
        bits in arb_normalized_bits(),
    ) {
        let params = ChainParams::simnet();
        let mut headers: Vec<Header> = Vec::new();
        let mut timestamp = 1_600_000_000;
        for (height, spacing) in spacings.iter().enumerate() {
            timestamp += spacing;
            headers.push(Header {
                height: height as u32,
                bits,
                timestamp,
                ..Default::default()
            });
        }
        let tip = headers.len() - 1;
        let next = WorkDifficultyCalculator::new(&params)
            .calc_next_required_difficulty(headers.as_slice(), Some(tip), timestamp + 1);
        prop_assert!(compact_to_big(next) <= params.pow_limit);
        prop_assert!(compact_to_big(next) > BigInt::from(0));
    }

    #[test]
    fn prop_stake_difficulty_clamped((height, cur, prev, pool) in arb_stake_params()) {
        let params = ChainParams::mainnet();
        let calc = StakeDifficultyCalculator::<RegularTickets>::new(&params);
        let next = calc.calc_next_stake_diff(height, cur, prev, pool);
        let econ = &params.tickets;
        let maximum = ticketchain_consensus::estimate_supply(&params, height)
            / econ.ticket_pool_size as i64;
        prop_assert!(next >= econ.minimum_stake_diff);
        prop_assert!(next <= maximum.max(econ.minimum_stake_diff));
    }

    #[test]
    fn prop_lottery_indices_distinct(
        seed in prop::array::uniform32(any::<u8>()),
        pool in 0usize..200,
        count in 0usize..10,
    ) {
        let mut prng = Hash256Prng::new(Hash(seed));
        let idxs = find_ticket_idxs(pool, count, &mut prng);
        prop_assert_eq!(idxs.len(), count.min(pool));
        prop_assert!(idxs.iter().all(|&i| i < pool));
        let unique: HashSet<_> = idxs.iter().collect();
        prop_assert_eq!(unique.len(), idxs.len());
    }
}
