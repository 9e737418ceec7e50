//! Stake node resolution over the block index.
//!
//! A node's ticket pool snapshot is derived from its parent by connecting
//! the block. When no parent snapshot is in memory the resolver rolls the
//! best tip's snapshot back to the fork point with the target and connects
//! forward from there, reading undo data of best chain blocks from storage.

use crate::block_index::{BlockIndex, NodeId};
use crate::block_source::BlockSource;
use crate::error::{StateError, StateResult};
use crate::stake_node::StakeNode;
use crate::ticket_store::{read_new_tickets, read_undo};
use std::marker::PhantomData;
use std::sync::Arc;
use ticketchain_consensus::{
    ChainParams, ChainView, Hash, StakeDifficultyCalculator, TicketEconomics, TicketKind,
};
use ticketchain_storage::{with_read_tx, ReadTransaction, Storage};
use tracing::{debug, error, instrument, trace};

/// Resolves [`StakeNode`]s for one ticket type.
///
/// Callers hold the chain state lock for the lifetime of the resolver.
pub struct StakeNodeResolver<'a, K: TicketKind> {
    params: &'a ChainParams,
    index: &'a BlockIndex,
    storage: &'a dyn Storage,
    blocks: &'a dyn BlockSource,
    _kind: PhantomData<K>,
}

impl<'a, K: TicketKind> StakeNodeResolver<'a, K> {
    pub fn new(
        params: &'a ChainParams,
        index: &'a BlockIndex,
        storage: &'a dyn Storage,
        blocks: &'a dyn BlockSource,
    ) -> Self {
        Self {
            params,
            index,
            storage,
            blocks,
            _kind: PhantomData,
        }
    }

    fn econ(&self) -> &'a TicketEconomics {
        K::economics(self.params)
    }

    /// Purchases in the last `ticket_maturity` blocks through `id`.
    fn immature_count(&self, id: NodeId) -> u32 {
        let maturity = self.econ().ticket_maturity as i64;
        let calc = StakeDifficultyCalculator::<K>::new(self.params);
        calc.sum_purchased_tickets(self.index, Some(id), maturity) as u32
    }

    /// Tickets entering the live pool at `id`.
    ///
    /// These are the purchases in the ancestor `ticket_maturity` blocks back.
    pub fn fetch_new_tickets(&self, id: NodeId) -> StateResult<Arc<[Hash]>> {
        let node = self.index.node(id);
        let slots = node.slots(K::TICKET_TYPE);
        if let Some(tickets) = slots.new_tickets() {
            return Ok(Arc::clone(tickets));
        }

        let econ = self.econ();
        let height = node.height();
        if height < econ.stake_enabled_height || height < econ.activation_height {
            return Ok(Arc::clone(slots.set_new_tickets(Arc::from(Vec::new()))));
        }

        let purchase_height = height - econ.ticket_maturity as i64;
        let ancestor = self.index.ancestor(id, purchase_height).ok_or_else(|| {
            StateError::BlockNotFound(format!(
                "ancestor at height {} of {}",
                purchase_height,
                node.hash()
            ))
        })?;
        let ancestor_hash = self.index.node(ancestor).hash();
        let transactions = self
            .blocks
            .fetch_transactions(&ancestor_hash)?
            .ok_or_else(|| {
                StateError::MissingStakeData(format!("transactions of block {}", ancestor_hash))
            })?;
        let tickets: Vec<Hash> = transactions
            .iter()
            .filter(|tx| K::is_purchase(tx))
            .map(|tx| tx.hash())
            .collect();

        trace!(
            ticket_type = %K::TICKET_TYPE,
            height,
            purchase_height,
            count = tickets.len(),
            "Matured tickets"
        );
        Ok(Arc::clone(slots.set_new_tickets(Arc::from(tickets))))
    }

    /// Ticket pool snapshot after block `target`.
    #[instrument(skip_all, fields(ticket_type = %K::TICKET_TYPE, target = target.0))]
    pub fn fetch_stake_node(&self, target: NodeId) -> StateResult<Arc<StakeNode>> {
        let node = self.index.node(target);
        let slots = node.slots(K::TICKET_TYPE);
        let econ = self.econ();

        if node.height() < econ.activation_height {
            return Ok(Arc::clone(
                slots.set_stake_node(Arc::new(StakeNode::null(node.height()))),
            ));
        }
        if let Some(cached) = slots.stake_node() {
            return Ok(Arc::clone(cached));
        }

        let parent = match node.parent() {
            Some(parent) => parent,
            None => return Ok(Arc::clone(slots.set_stake_node(Arc::new(StakeNode::genesis())))),
        };
        if let Some(parent_node) = self.index.node(parent).slots(K::TICKET_TYPE).stake_node() {
            let parent_node = Arc::clone(parent_node);
            return self.connect_child(&parent_node, target);
        }

        let tip = self
            .index
            .best_tip()
            .filter(|tip| self.index.node(*tip).slots(K::TICKET_TYPE).stake_node().is_some());
        match tip {
            Some(tip) => self.resolve_via_tip(tip, target),
            None => self.resolve_forward(target),
        }
    }

    /// Connect block `id` on top of its parent's snapshot.
    fn connect_child(&self, parent: &StakeNode, id: NodeId) -> StateResult<Arc<StakeNode>> {
        let node = self.index.node(id);
        let slots = node.slots(K::TICKET_TYPE);
        if let Some(cached) = slots.stake_node() {
            return Ok(Arc::clone(cached));
        }

        let econ = self.econ();
        let resolved = if node.height() < econ.activation_height {
            StakeNode::null(node.height())
        } else {
            let new_tickets = self.fetch_new_tickets(id)?;
            parent.connect(
                econ,
                node.lottery_iv(),
                slots.voted(),
                slots.revoked(),
                new_tickets,
                self.immature_count(id),
            )?
        };

        trace!(
            height = resolved.height(),
            live = resolved.pool_size(),
            "Connected stake node"
        );
        Ok(Arc::clone(slots.set_stake_node(Arc::new(resolved))))
    }

    /// Roll the best tip's snapshot back to the fork with `target`, then
    /// connect forward along the target's branch.
    fn resolve_via_tip(&self, tip: NodeId, target: NodeId) -> StateResult<Arc<StakeNode>> {
        let plan = self.index.reorg_plan(target)?;
        let tip_node = self
            .index
            .node(tip)
            .slots(K::TICKET_TYPE)
            .stake_node()
            .map(Arc::clone)
            .ok_or_else(|| StateError::Assertion("best tip stake node vanished".to_string()))?;

        let detached = with_read_tx(self.storage, |tx| {
            let mut detached: Vec<(NodeId, Arc<StakeNode>)> =
                Vec::with_capacity(plan.detach.len());
            let mut reached = tip;
            let mut current = Arc::clone(&tip_node);
            for &id in &plan.detach {
                if id != reached {
                    break;
                }
                let parent = match self.index.node(id).parent() {
                    Some(parent) => parent,
                    None => break,
                };
                current = self.disconnect_to_parent(tx, &current, parent)?;
                reached = parent;
                detached.push((reached, Arc::clone(&current)));
            }
            Ok::<_, StateError>(detached)
        })?;

        let (reached, mut current) = match detached.last() {
            Some((id, node)) => (*id, Arc::clone(node)),
            None => (tip, tip_node),
        };
        let fork_height = self.index.node(plan.fork).height();
        if reached != plan.fork || current.height() != fork_height {
            error!(
                expected_height = fork_height,
                expected_hash = %self.index.node(plan.fork).hash(),
                actual_height = current.height(),
                actual_hash = %self.index.node(reached).hash(),
                "Detach did not end at the fork point"
            );
            return Err(StateError::Assertion(format!(
                "detach ended at {} height {}, expected fork {} height {}",
                self.index.node(reached).hash(),
                current.height(),
                self.index.node(plan.fork).hash(),
                fork_height
            )));
        }
        for (id, node) in detached {
            let cached = self.index.node(id).slots(K::TICKET_TYPE).set_stake_node(node);
            if id == reached {
                current = Arc::clone(cached);
            }
        }

        for &id in &plan.attach {
            current = self.connect_child(&current, id)?;
        }

        debug!(
            fork_height,
            detached = plan.detach.len(),
            attached = plan.attach.len(),
            "Resolved stake node through reorg"
        );
        Ok(current)
    }

    /// Snapshot at `parent` from its child's snapshot.
    ///
    /// Undo data and matured tickets of the parent come from memory, or from
    /// storage for blocks whose snapshots were evicted. The result is not
    /// cached here.
    fn disconnect_to_parent(
        &self,
        tx: &dyn ReadTransaction,
        child: &StakeNode,
        parent: NodeId,
    ) -> StateResult<Arc<StakeNode>> {
        let node = self.index.node(parent);
        let slots = node.slots(K::TICKET_TYPE);
        if let Some(cached) = slots.stake_node() {
            return Ok(Arc::clone(cached));
        }

        let econ = self.econ();
        let height = node.height();
        let resolved = if height < econ.activation_height {
            StakeNode::null(height)
        } else if node.parent().is_none() {
            StakeNode::genesis()
        } else {
            let hash = node.hash();
            let undo = match slots.undo() {
                Some(undo) => Arc::clone(undo),
                None => read_undo(tx, K::TICKET_TYPE, &hash)?.ok_or_else(|| {
                    StateError::MissingStakeData(format!("undo data of block {}", hash))
                })?,
            };
            let tickets = match slots.new_tickets() {
                Some(tickets) => Arc::clone(tickets),
                None => read_new_tickets(tx, K::TICKET_TYPE, &hash)?.ok_or_else(|| {
                    StateError::MissingStakeData(format!("matured tickets of block {}", hash))
                })?,
            };
            child.disconnect(
                econ,
                node.lottery_iv(),
                undo,
                tickets,
                self.immature_count(parent),
            )?
        };

        trace!(height, live = resolved.pool_size(), "Disconnected stake node");
        Ok(Arc::new(resolved))
    }

    /// Connect forward from the nearest ancestor with a known snapshot.
    fn resolve_forward(&self, target: NodeId) -> StateResult<Arc<StakeNode>> {
        let econ = self.econ();
        let mut pending = Vec::new();
        let mut cursor = target;
        let base = loop {
            let node = self.index.node(cursor);
            let slots = node.slots(K::TICKET_TYPE);
            if let Some(cached) = slots.stake_node() {
                break Arc::clone(cached);
            }
            if node.height() < econ.activation_height {
                break Arc::clone(slots.set_stake_node(Arc::new(StakeNode::null(node.height()))));
            }
            match node.parent() {
                Some(parent) => {
                    pending.push(cursor);
                    cursor = parent;
                }
                None => break Arc::clone(slots.set_stake_node(Arc::new(StakeNode::genesis()))),
            }
        };

        debug!(
            base_height = base.height(),
            attached = pending.len(),
            "Resolving stake node forward"
        );
        let mut current = base;
        for &id in pending.iter().rev() {
            current = self.connect_child(&current, id)?;
        }
        Ok(current)
    }
}
