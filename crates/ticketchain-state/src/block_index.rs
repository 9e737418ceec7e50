//! In-memory block tree.
//!
//! Nodes live in an arena and refer to their parent by [`NodeId`]. Per ticket
//! type each node carries the spends supplied with the block and write-once
//! caches for the derived ticket pool data.

use crate::error::{StateError, StateResult};
use crate::stake_node::{StakeNode, UndoTicketData};
use num_bigint::BigInt;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use ticketchain_consensus::{calc_work, ChainView, Hash, Header, TicketType};
use tracing::debug;

/// Handle of a node in a [`BlockIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Votes and revocations a block carries for one ticket type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StakeSpends {
    pub voted: Vec<Hash>,
    pub revoked: Vec<Hash>,
}

/// Ticket data attached to a node for one ticket type.
#[derive(Debug, Default)]
pub struct StakeSlots {
    spends: StakeSpends,
    new_tickets: OnceCell<Arc<[Hash]>>,
    stake_node: OnceCell<Arc<StakeNode>>,
    undo: OnceCell<Arc<[UndoTicketData]>>,
}

impl StakeSlots {
    fn new(spends: StakeSpends) -> Self {
        Self {
            spends,
            ..Default::default()
        }
    }

    pub fn voted(&self) -> &[Hash] {
        &self.spends.voted
    }

    pub fn revoked(&self) -> &[Hash] {
        &self.spends.revoked
    }

    pub fn new_tickets(&self) -> Option<&Arc<[Hash]>> {
        self.new_tickets.get()
    }

    pub fn stake_node(&self) -> Option<&Arc<StakeNode>> {
        self.stake_node.get()
    }

    pub fn undo(&self) -> Option<&Arc<[UndoTicketData]>> {
        self.undo.get()
    }

    /// Store the matured tickets, keeping an earlier value if present.
    pub fn set_new_tickets(&self, tickets: Arc<[Hash]>) -> &Arc<[Hash]> {
        self.new_tickets.get_or_init(|| tickets)
    }

    /// Store a resolved snapshot, keeping an earlier value if present.
    ///
    /// The snapshot's undo data and matured tickets are cached alongside.
    pub fn set_stake_node(&self, node: Arc<StakeNode>) -> &Arc<StakeNode> {
        let _ = self.new_tickets.set(node.new_tickets());
        let _ = self.undo.set(node.undo_data());
        self.stake_node.get_or_init(|| node)
    }

    fn clear(&mut self) {
        self.new_tickets.take();
        self.stake_node.take();
        self.undo.take();
    }
}

/// A block in the tree.
#[derive(Debug)]
pub struct BlockNode {
    hash: Hash,
    header: Header,
    parent: Option<NodeId>,
    work_sum: BigInt,
    regular: StakeSlots,
    ai: StakeSlots,
}

impl BlockNode {
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn height(&self) -> i64 {
        self.header.height as i64
    }

    /// Cumulative work from genesis through this block.
    pub fn work_sum(&self) -> &BigInt {
        &self.work_sum
    }

    /// Seeds the lottery for the next block.
    pub fn lottery_iv(&self) -> Hash {
        self.hash
    }

    pub fn slots(&self, ticket_type: TicketType) -> &StakeSlots {
        match ticket_type {
            TicketType::Regular => &self.regular,
            TicketType::Ai => &self.ai,
        }
    }
}

/// Fork point and paths between the best tip and a target block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorgPlan {
    /// Last block shared by both chains.
    pub fork: NodeId,
    /// Best chain blocks to disconnect, tip first.
    pub detach: Vec<NodeId>,
    /// Blocks to connect after the fork, lowest first.
    pub attach: Vec<NodeId>,
}

/// Arena of block nodes with a tracked best tip.
#[derive(Debug, Default)]
pub struct BlockIndex {
    nodes: Vec<BlockNode>,
    by_hash: HashMap<Hash, NodeId>,
    best_tip: Option<NodeId>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &BlockNode {
        &self.nodes[id.0 as usize]
    }

    pub fn lookup(&self, hash: &Hash) -> Option<NodeId> {
        self.by_hash.get(hash).copied()
    }

    pub fn genesis(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId(0))
    }

    pub fn best_tip(&self) -> Option<NodeId> {
        self.best_tip
    }

    /// Override the best tip chosen by cumulative work.
    pub fn set_best_tip(&mut self, id: NodeId) {
        self.best_tip = Some(id);
    }

    /// Add a header to the tree.
    ///
    /// The first header must be genesis; every later one must extend a known
    /// block. Re-adding a known header returns its existing handle. The best
    /// tip moves to the new node when it carries more cumulative work.
    pub fn insert(
        &mut self,
        header: Header,
        regular: StakeSpends,
        ai: StakeSpends,
    ) -> StateResult<NodeId> {
        let hash = header.hash();
        if let Some(id) = self.lookup(&hash) {
            return Ok(id);
        }

        let parent = if self.nodes.is_empty() {
            if header.height != 0 {
                return Err(StateError::InvalidBlock(format!(
                    "first block {} has height {}, expected genesis",
                    hash, header.height
                )));
            }
            None
        } else {
            let parent = self.lookup(&header.prev_block).ok_or_else(|| {
                StateError::BlockNotFound(format!("parent {} of {}", header.prev_block, hash))
            })?;
            let parent_height = self.node(parent).height();
            if header.height as i64 != parent_height + 1 {
                return Err(StateError::InvalidBlock(format!(
                    "block {} has height {}, parent is at {}",
                    hash, header.height, parent_height
                )));
            }
            Some(parent)
        };

        let work = calc_work(header.bits);
        let work_sum = match parent {
            Some(p) => self.node(p).work_sum() + work,
            None => work,
        };

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(BlockNode {
            hash,
            header,
            parent,
            work_sum,
            regular: StakeSlots::new(regular),
            ai: StakeSlots::new(ai),
        });
        self.by_hash.insert(hash, id);

        let better = match self.best_tip {
            Some(tip) => self.node(id).work_sum() > self.node(tip).work_sum(),
            None => true,
        };
        if better {
            self.best_tip = Some(id);
        }
        Ok(id)
    }

    /// Drop cached ticket data of a node so it must be recomputed or loaded
    /// from storage.
    pub fn evict_stake_data(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0 as usize];
        node.regular.clear();
        node.ai.clear();
    }

    /// Closest block that is an ancestor of both `a` and `b`.
    pub fn find_fork(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut a = Some(a);
        let mut b = Some(b);
        loop {
            let (x, y) = (a?, b?);
            if x == y {
                return Some(x);
            }
            let (hx, hy) = (self.node(x).height(), self.node(y).height());
            if hx >= hy {
                a = self.node(x).parent;
            }
            if hy >= hx {
                b = self.node(y).parent;
            }
        }
    }

    /// Paths from the best tip to `target` through their fork point.
    pub fn reorg_plan(&self, target: NodeId) -> StateResult<ReorgPlan> {
        let tip = self
            .best_tip
            .ok_or_else(|| StateError::BlockNotFound("best tip".to_string()))?;
        let fork = self.find_fork(tip, target).ok_or_else(|| {
            StateError::BlockNotFound(format!(
                "common ancestor of {} and {}",
                self.node(tip).hash,
                self.node(target).hash
            ))
        })?;

        let detach = self.path_down(tip, fork);
        let mut attach = self.path_down(target, fork);
        attach.reverse();

        debug!(
            fork_height = self.node(fork).height(),
            detach = detach.len(),
            attach = attach.len(),
            "Reorg plan"
        );
        Ok(ReorgPlan {
            fork,
            detach,
            attach,
        })
    }

    /// Nodes from `from` down to, but excluding, its ancestor `to`.
    fn path_down(&self, from: NodeId, to: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = from;
        while current != to {
            path.push(current);
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        path
    }
}

impl ChainView for BlockIndex {
    type Node = NodeId;

    fn header(&self, node: NodeId) -> &Header {
        &self.node(node).header
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }
}
