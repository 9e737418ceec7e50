//! Stake node resolution scenarios.
//!
//! Chains are built with real purchases and votes, then caches are evicted
//! to force resolution through reorg detach, storage reads and forward
//! replay.

use crate::harness::*;
use std::sync::Arc;
use ticketchain_consensus::{AiTickets, RegularTickets, TicketType};
use ticketchain_state::{NodeId, StakeNode, StateError};

/// Template with periodic missed votes and revocations.
fn varied(height: usize, salt: u32) -> BlockTemplate {
    BlockTemplate {
        regular_buys: 2 + (height % 3) as u8,
        ai_buys: 1,
        votes: (height % 5 == 0).then_some(1),
        revoke_missed: height % 7 == 0,
        salt,
    }
}

fn varied_chain(builder: &mut ChainBuilder, from: NodeId, len: usize, salt: u32) -> Vec<NodeId> {
    let mut ids = vec![from];
    let start = builder.index.node(from).height() as usize;
    for i in 1..=len {
        let tip = ids[i - 1];
        ids.push(builder.extend(tip, &varied(start + i, salt)));
    }
    ids
}

/// Main chain of `main_len` blocks with every snapshot persisted, plus a
/// side branch of `side_len` blocks forking at `fork_height`.
fn forked(main_len: usize, fork_height: usize, side_len: usize) -> (ChainBuilder, Vec<NodeId>, Vec<NodeId>) {
    let mut builder = ChainBuilder::new(test_params());
    let genesis = builder.genesis();
    let main = varied_chain(&mut builder, genesis, main_len, 0);
    let side = varied_chain(&mut builder, main[fork_height], side_len, 1);
    builder.index.set_best_tip(main[main_len]);
    builder.stake_node::<RegularTickets>(main[main_len]);
    builder.stake_node::<AiTickets>(main[main_len]);
    builder.persist(&main);
    (builder, main, side)
}

#[test]
fn test_repeat_resolution_reads_nothing() {
    let (mut builder, main, _) = forked(40, 40, 0);
    builder.evict(&main[1..40]);

    let before = builder.storage.reads();
    let first = builder.stake_node::<RegularTickets>(main[25]);
    let cold_reads = builder.storage.reads() - before;
    assert!(cold_reads > 0);

    let second = builder.stake_node::<RegularTickets>(main[25]);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(builder.storage.reads(), before + cold_reads);
}

#[test]
fn test_warm_parent_reads_nothing() {
    let mut builder = ChainBuilder::new(test_params());
    let genesis = builder.genesis();
    let main = builder.chain(genesis, 30, &BlockTemplate::default());

    let before = builder.storage.reads();
    builder.stake_node::<RegularTickets>(main[30]);
    builder.stake_node::<AiTickets>(main[30]);
    assert_eq!(builder.storage.reads(), before);
    assert_eq!(builder.storage.read_txs(), 0);
}

fn assert_reorg_symmetry(main_len: usize, fork_height: usize, side_len: usize) {
    let (mut builder, main, side) = forked(main_len, fork_height, side_len);
    let target = side[side_len];
    let expected_regular = builder.stake_node::<RegularTickets>(target);
    let expected_ai = builder.stake_node::<AiTickets>(target);

    builder.evict(&main[..main_len]);
    builder.evict(&side[1..]);
    let regular_via_tip = builder.stake_node::<RegularTickets>(target);
    let ai_via_tip = builder.stake_node::<AiTickets>(target);

    builder.evict_all();
    let regular_cold = builder.stake_node::<RegularTickets>(target);
    let ai_cold = builder.stake_node::<AiTickets>(target);

    assert_eq!(*regular_via_tip, *regular_cold);
    assert_eq!(*regular_via_tip, *expected_regular);
    assert_eq!(*ai_via_tip, *ai_cold);
    assert_eq!(*ai_via_tip, *expected_ai);
}

#[test]
fn test_reorg_symmetry_after_votes_start() {
    assert_reorg_symmetry(48, 36, 6);
}

#[test]
fn test_reorg_symmetry_across_ai_activation() {
    assert_reorg_symmetry(40, 18, 12);
}

#[test]
fn test_reorg_symmetry_before_stake_enabled() {
    assert_reorg_symmetry(30, 3, 20);
}

#[test]
fn test_reorg_caches_fork_point() {
    let (mut builder, main, side) = forked(40, 30, 4);
    builder.evict(&main[20..40]);
    builder.evict(&side[1..]);
    builder.stake_node::<RegularTickets>(side[4]);

    let fork = builder.index.node(main[30]).slots(TicketType::Regular);
    assert_eq!(fork.stake_node().map(|n| n.height()), Some(30));
    // Below the fork nothing was touched
    assert!(builder
        .index
        .node(main[29])
        .slots(TicketType::Regular)
        .stake_node()
        .is_none());
}

#[test]
fn test_rewind_restores_missed_and_revoked() {
    let (mut builder, main, _) = forked(48, 48, 0);
    let expected = builder.stake_node::<RegularTickets>(main[30]);
    assert!(expected.revoked_count() > 0);

    builder.evict(&main[1..48]);
    let rewound = builder.stake_node::<RegularTickets>(main[30]);
    assert_eq!(*rewound, *expected);
}

#[test]
fn test_rewind_below_stake_enabled() {
    let (mut builder, main, _) = forked(36, 36, 0);
    let expected = builder.stake_node::<RegularTickets>(main[5]);
    builder.evict(&main[..36]);
    assert_eq!(*builder.stake_node::<RegularTickets>(main[5]), *expected);
    assert_eq!(*builder.stake_node::<RegularTickets>(main[0]), StakeNode::genesis());
}

#[test]
fn test_missing_undo_is_reported() {
    let mut builder = ChainBuilder::new(test_params());
    let genesis = builder.genesis();
    let main = builder.chain(genesis, 20, &BlockTemplate::default());
    builder.stake_node::<RegularTickets>(main[20]);
    builder.evict(&main[1..20]);

    let err = builder.try_stake_node::<RegularTickets>(main[10]).unwrap_err();
    assert!(matches!(err, StateError::MissingStakeData(_)));
    assert!(!err.is_assertion());
}

#[test]
fn test_fork_point_mismatch_is_an_assertion() {
    let (mut builder, main, side) = forked(20, 19, 1);
    builder.evict(&main[19..=20]);
    builder.evict(&side[1..]);
    let bogus = Arc::new(StakeNode::null(25));
    builder
        .index
        .node(main[20])
        .slots(TicketType::Regular)
        .set_stake_node(bogus);

    let err = builder.try_stake_node::<RegularTickets>(side[1]).unwrap_err();
    assert!(err.is_assertion());
    // The failed detach leaves no snapshot behind
    assert!(builder
        .index
        .node(main[19])
        .slots(TicketType::Regular)
        .stake_node()
        .is_none());
}

#[test]
fn test_ai_pool_tracks_activation() {
    let mut builder = ChainBuilder::new(test_params());
    let genesis = builder.genesis();
    let main = builder.chain(genesis, 40, &BlockTemplate::default());

    assert!(!builder.stake_node::<AiTickets>(main[19]).is_active());
    let activated = builder.stake_node::<AiTickets>(main[20]);
    assert!(activated.is_active());
    assert_eq!(activated.pool_size(), 0);

    // Four tickets mature before votes start, then one matures and one
    // votes per block until the first expiry
    let at30 = builder.stake_node::<AiTickets>(main[30]);
    assert_eq!(at30.pool_size(), 4);
    assert_eq!(at30.winners().len(), 1);
    assert_eq!(builder.stake_node::<RegularTickets>(main[40]).winners().len(), 3);
}

#[test]
fn test_persisted_ticket_data_matches_cache() {
    let (builder, main, _) = forked(30, 30, 0);
    for &id in &main[1..] {
        let hash = builder.hash(id);
        let node = builder.stake_node::<RegularTickets>(id);
        let undo = builder.tickets().undo(TicketType::Regular, &hash).unwrap().unwrap();
        let tickets = builder
            .tickets()
            .new_tickets(TicketType::Regular, &hash)
            .unwrap()
            .unwrap();
        assert_eq!(undo, node.undo_data());
        assert_eq!(tickets, node.new_tickets());
    }
}
