//! # ticketchain-state
//!
//! Ticket pool state for the ticketchain consensus core.
//!
//! This crate provides:
//! - An arena block index with best tip tracking and reorg planning
//! - Immutable ticket pool snapshots with connect/disconnect transitions
//! - The deterministic winning ticket lottery
//! - Persistence of per-block undo data and matured tickets
//! - Stake node resolution generic over the ticket type
//!
//! ## Architecture
//!
//! - `BlockIndex`: Block tree addressed by `NodeId`, with write-once ticket caches
//! - `StakeNode`: Ticket pool snapshot after one block
//! - `TicketStore`: Undo data and matured tickets of best chain blocks
//! - `StakeNodeResolver`: Derives snapshots from cached neighbours or storage

mod block_index;
mod block_source;
mod error;
mod lottery;
mod resolver;
mod stake_node;
mod ticket_store;

pub use block_index::{BlockIndex, BlockNode, NodeId, ReorgPlan, StakeSlots, StakeSpends};
pub use block_source::{BlockSource, MemoryBlockSource};
pub use error::{StateError, StateResult};
pub use lottery::{find_ticket_idxs, Hash256Prng};
pub use resolver::StakeNodeResolver;
pub use stake_node::{MissedTicket, StakeNode, UndoTicketData};
pub use ticket_store::{
    decode_hashes, decode_undo, encode_hashes, encode_undo, read_new_tickets, read_undo,
    ticket_key, TicketStore,
};

use ticketchain_storage::ColumnFamily;

/// State-related column families.
pub mod columns {
    use super::ColumnFamily;

    /// Undo data per ticket type and block.
    pub const TICKET_UNDO: ColumnFamily = ColumnFamily::TicketUndo;
    /// Matured tickets per ticket type and block.
    pub const NEW_TICKETS: ColumnFamily = ColumnFamily::NewTickets;
}
