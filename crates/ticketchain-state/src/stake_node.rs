//! Immutable ticket pool snapshots.
//!
//! A [`StakeNode`] describes the ticket pool after a block: live tickets
//! eligible for selection, missed and revoked tickets, and the winners the
//! next block must vote with. [`StakeNode::connect`] derives the child
//! snapshot, [`StakeNode::disconnect`] the parent one. Neither mutates `self`.

use crate::error::{StateError, StateResult};
use crate::lottery::{find_ticket_idxs, Hash256Prng};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use ticketchain_consensus::{Hash, TicketEconomics};

/// A ticket that left the live pool without voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissedTicket {
    /// Purchase height.
    pub height: i64,
    /// Left the pool by expiring rather than by being selected.
    pub expired: bool,
}

/// State a ticket had before a block changed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoTicketData {
    pub ticket_hash: Hash,
    /// Purchase height.
    pub ticket_height: i64,
    pub missed: bool,
    pub revoked: bool,
    pub spent: bool,
    pub expired: bool,
}

impl UndoTicketData {
    fn new_ticket(ticket_hash: Hash, ticket_height: i64) -> Self {
        Self {
            ticket_hash,
            ticket_height,
            missed: false,
            revoked: false,
            spent: false,
            expired: false,
        }
    }
}

/// Ticket pool snapshot at one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeNode {
    height: i64,
    active: bool,
    live: BTreeMap<Hash, i64>,
    missed: BTreeMap<Hash, MissedTicket>,
    revoked: BTreeMap<Hash, MissedTicket>,
    next_winners: Vec<Hash>,
    undo_data: Arc<[UndoTicketData]>,
    new_tickets: Arc<[Hash]>,
    immature: u32,
}

impl StakeNode {
    /// Empty pool at genesis.
    pub fn genesis() -> Self {
        Self {
            height: 0,
            active: true,
            live: BTreeMap::new(),
            missed: BTreeMap::new(),
            revoked: BTreeMap::new(),
            next_winners: Vec::new(),
            undo_data: Arc::from(Vec::new()),
            new_tickets: Arc::from(Vec::new()),
            immature: 0,
        }
    }

    /// Canonical state of a ticket type that is not active yet at `height`.
    pub fn null(height: i64) -> Self {
        Self {
            height,
            active: false,
            ..Self::genesis()
        }
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    /// `false` for the null state.
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn live_tickets(&self) -> &BTreeMap<Hash, i64> {
        &self.live
    }

    pub fn missed_tickets(&self) -> &BTreeMap<Hash, MissedTicket> {
        &self.missed
    }

    pub fn revoked_tickets(&self) -> &BTreeMap<Hash, MissedTicket> {
        &self.revoked
    }

    /// Tickets the next block votes with.
    pub fn winners(&self) -> &[Hash] {
        &self.next_winners
    }

    /// Changes this block made to the pool, in application order.
    pub fn undo_data(&self) -> Arc<[UndoTicketData]> {
        Arc::clone(&self.undo_data)
    }

    /// Tickets that entered the live pool at this block.
    pub fn new_tickets(&self) -> Arc<[Hash]> {
        Arc::clone(&self.new_tickets)
    }

    pub fn pool_size(&self) -> usize {
        self.live.len()
    }

    pub fn missed_count(&self) -> usize {
        self.missed.len()
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    /// Expired tickets that have not been revoked.
    pub fn expired_count(&self) -> usize {
        self.missed.values().filter(|t| t.expired).count()
    }

    /// Purchases still maturing as of this block.
    pub fn immature_count(&self) -> u32 {
        self.immature
    }

    pub fn exists_live_ticket(&self, ticket: &Hash) -> bool {
        self.live.contains_key(ticket)
    }

    pub fn exists_missed_ticket(&self, ticket: &Hash) -> bool {
        self.missed.contains_key(ticket)
    }

    pub fn exists_revoked_ticket(&self, ticket: &Hash) -> bool {
        self.revoked.contains_key(ticket)
    }

    /// Apply a block to produce the snapshot at `height + 1`.
    ///
    /// # Arguments
    /// * `econ` - Economics of this ticket type
    /// * `lottery_iv` - Hash of the block being connected, seeds winner selection
    /// * `voted` - Winners that voted in the block
    /// * `revoked` - Missed tickets revoked in the block
    /// * `new_tickets` - Purchases maturing into the live pool at this block
    /// * `immature` - Purchases still maturing after this block
    pub fn connect(
        &self,
        econ: &TicketEconomics,
        lottery_iv: Hash,
        voted: &[Hash],
        revoked: &[Hash],
        new_tickets: Arc<[Hash]>,
        immature: u32,
    ) -> StateResult<StakeNode> {
        let height = self.height + 1;
        let mut live = self.live.clone();
        let mut missed = self.missed.clone();
        let mut revoked_map = self.revoked.clone();
        let mut undo = Vec::new();

        if height >= econ.stake_enabled_height {
            let mut seen = HashSet::with_capacity(voted.len());
            for ticket in voted {
                if !seen.insert(*ticket) {
                    return Err(StateError::StakeRule(format!(
                        "ticket {} voted twice at height {}",
                        ticket, height
                    )));
                }
                if !self.next_winners.contains(ticket) {
                    return Err(StateError::StakeRule(format!(
                        "ticket {} voted at height {} but was not selected",
                        ticket, height
                    )));
                }
            }

            // Every selected ticket leaves the pool: voters are spent, the rest missed.
            for winner in &self.next_winners {
                let ticket_height = live.remove(winner).ok_or_else(|| {
                    StateError::StakeRule(format!(
                        "selected ticket {} is not live at height {}",
                        winner, self.height
                    ))
                })?;
                let spent = seen.contains(winner);
                if !spent {
                    missed.insert(
                        *winner,
                        MissedTicket {
                            height: ticket_height,
                            expired: false,
                        },
                    );
                }
                undo.push(UndoTicketData {
                    ticket_hash: *winner,
                    ticket_height,
                    missed: !spent,
                    revoked: false,
                    spent,
                    expired: false,
                });
            }

            let expire_below = height - econ.ticket_maturity as i64 - econ.ticket_expiry as i64;
            let expiring: Vec<(Hash, i64)> = live
                .iter()
                .filter(|(_, &h)| h < expire_below)
                .map(|(k, &h)| (*k, h))
                .collect();
            for (ticket, ticket_height) in expiring {
                live.remove(&ticket);
                missed.insert(
                    ticket,
                    MissedTicket {
                        height: ticket_height,
                        expired: true,
                    },
                );
                undo.push(UndoTicketData {
                    ticket_hash: ticket,
                    ticket_height,
                    missed: true,
                    revoked: false,
                    spent: false,
                    expired: true,
                });
            }

            for ticket in revoked {
                let entry = missed.remove(ticket).ok_or_else(|| {
                    StateError::StakeRule(format!(
                        "revoked ticket {} is not missed at height {}",
                        ticket, height
                    ))
                })?;
                revoked_map.insert(*ticket, entry);
                undo.push(UndoTicketData {
                    ticket_hash: *ticket,
                    ticket_height: entry.height,
                    missed: true,
                    revoked: true,
                    spent: false,
                    expired: entry.expired,
                });
            }
        }

        let purchase_height = height - econ.ticket_maturity as i64;
        for ticket in new_tickets.iter() {
            if live.insert(*ticket, purchase_height).is_some() {
                return Err(StateError::StakeRule(format!(
                    "ticket {} matured twice at height {}",
                    ticket, height
                )));
            }
            undo.push(UndoTicketData::new_ticket(*ticket, purchase_height));
        }

        let next_winners = select_winners(econ, height, lottery_iv, &live);

        Ok(StakeNode {
            height,
            active: true,
            live,
            missed,
            revoked: revoked_map,
            next_winners,
            undo_data: Arc::from(undo),
            new_tickets,
            immature,
        })
    }

    /// Revert this block to produce the snapshot at `height - 1`.
    ///
    /// # Arguments
    /// * `econ` - Economics of this ticket type
    /// * `parent_lottery_iv` - Hash of the parent block
    /// * `parent_undo` - Undo data recorded when the parent was connected
    /// * `parent_tickets` - Tickets that matured at the parent
    /// * `parent_immature` - Purchases still maturing after the parent
    pub fn disconnect(
        &self,
        econ: &TicketEconomics,
        parent_lottery_iv: Hash,
        parent_undo: Arc<[UndoTicketData]>,
        parent_tickets: Arc<[Hash]>,
        parent_immature: u32,
    ) -> StateResult<StakeNode> {
        let height = self.height - 1;
        if height < 0 {
            return Err(StateError::StakeRule("cannot disconnect genesis".to_string()));
        }
        if height < econ.activation_height {
            return Ok(StakeNode::null(height));
        }
        if height == 0 {
            return Ok(StakeNode::genesis());
        }

        let mut live = self.live.clone();
        let mut missed = self.missed.clone();
        let mut revoked = self.revoked.clone();

        for undo in self.undo_data.iter().rev() {
            let ticket = undo.ticket_hash;
            match (undo.missed, undo.revoked, undo.spent) {
                (false, false, false) => {
                    if live.remove(&ticket).is_none() {
                        return Err(StateError::StakeRule(format!(
                            "new ticket {} missing from live pool at height {}",
                            ticket, self.height
                        )));
                    }
                }
                (true, true, false) => {
                    if revoked.remove(&ticket).is_none() {
                        return Err(StateError::StakeRule(format!(
                            "revoked ticket {} missing at height {}",
                            ticket, self.height
                        )));
                    }
                    missed.insert(
                        ticket,
                        MissedTicket {
                            height: undo.ticket_height,
                            expired: undo.expired,
                        },
                    );
                }
                (true, false, false) => {
                    if missed.remove(&ticket).is_none() {
                        return Err(StateError::StakeRule(format!(
                            "missed ticket {} missing at height {}",
                            ticket, self.height
                        )));
                    }
                    live.insert(ticket, undo.ticket_height);
                }
                (false, false, true) => {
                    live.insert(ticket, undo.ticket_height);
                }
                _ => {
                    return Err(StateError::StakeRule(format!(
                        "unknown undo state for ticket {} at height {}",
                        ticket, self.height
                    )));
                }
            }
        }

        let next_winners = select_winners(econ, height, parent_lottery_iv, &live);

        Ok(StakeNode {
            height,
            active: true,
            live,
            missed,
            revoked,
            next_winners,
            undo_data: parent_undo,
            new_tickets: parent_tickets,
            immature: parent_immature,
        })
    }
}

/// Winners for the block after `height`.
///
/// The first votes are due at stake validation height, so selection starts
/// one block earlier.
fn select_winners(
    econ: &TicketEconomics,
    height: i64,
    lottery_iv: Hash,
    live: &BTreeMap<Hash, i64>,
) -> Vec<Hash> {
    if height < econ.stake_validation_height - 1 || live.is_empty() {
        return Vec::new();
    }
    let mut prng = Hash256Prng::new(lottery_iv);
    let keys: Vec<&Hash> = live.keys().collect();
    find_ticket_idxs(keys.len(), econ.tickets_per_block as usize, &mut prng)
        .into_iter()
        .map(|idx| *keys[idx])
        .collect()
}
