//! Persistence of per-block ticket data.
//!
//! Undo data and matured-ticket lists of best chain blocks are written by
//! block connection so that a reorg can disconnect blocks whose stake nodes
//! are no longer in memory.

use crate::columns;
use crate::error::{StateError, StateResult};
use crate::stake_node::{StakeNode, UndoTicketData};
use std::sync::Arc;
use ticketchain_consensus::{Hash, TicketType};
use ticketchain_storage::{with_read_tx, ReadTransaction, Storage, WriteBatch};

const HASH_LEN: usize = 32;
const UNDO_ENTRY_LEN: usize = HASH_LEN + 8 + 1;

const FLAG_MISSED: u8 = 1 << 0;
const FLAG_REVOKED: u8 = 1 << 1;
const FLAG_SPENT: u8 = 1 << 2;
const FLAG_EXPIRED: u8 = 1 << 3;

/// Key of a block's ticket data: type tag followed by the block hash.
pub fn ticket_key(ticket_type: TicketType, block: &Hash) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + HASH_LEN);
    key.push(ticket_type.tag());
    key.extend_from_slice(block.as_bytes());
    key
}

pub fn encode_undo(entries: &[UndoTicketData]) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * UNDO_ENTRY_LEN);
    for entry in entries {
        out.extend_from_slice(entry.ticket_hash.as_bytes());
        out.extend_from_slice(&entry.ticket_height.to_be_bytes());
        let mut flags = 0u8;
        if entry.missed {
            flags |= FLAG_MISSED;
        }
        if entry.revoked {
            flags |= FLAG_REVOKED;
        }
        if entry.spent {
            flags |= FLAG_SPENT;
        }
        if entry.expired {
            flags |= FLAG_EXPIRED;
        }
        out.push(flags);
    }
    out
}

pub fn decode_undo(bytes: &[u8]) -> StateResult<Vec<UndoTicketData>> {
    if bytes.len() % UNDO_ENTRY_LEN != 0 {
        return Err(StateError::Serialization(format!(
            "undo data length {} is not a multiple of {}",
            bytes.len(),
            UNDO_ENTRY_LEN
        )));
    }
    bytes
        .chunks_exact(UNDO_ENTRY_LEN)
        .map(|chunk| {
            let (hash, rest) = chunk.split_at(HASH_LEN);
            let (height, flags) = rest.split_at(8);
            let ticket_hash = Hash::from_slice(hash)
                .ok_or_else(|| StateError::Serialization("bad ticket hash".to_string()))?;
            let height: [u8; 8] = height
                .try_into()
                .map_err(|_| StateError::Serialization("bad ticket height".to_string()))?;
            let flags = flags[0];
            if flags & !(FLAG_MISSED | FLAG_REVOKED | FLAG_SPENT | FLAG_EXPIRED) != 0 {
                return Err(StateError::Serialization(format!(
                    "unknown undo flags 0x{:02x} for ticket {}",
                    flags, ticket_hash
                )));
            }
            Ok(UndoTicketData {
                ticket_hash,
                ticket_height: i64::from_be_bytes(height),
                missed: flags & FLAG_MISSED != 0,
                revoked: flags & FLAG_REVOKED != 0,
                spent: flags & FLAG_SPENT != 0,
                expired: flags & FLAG_EXPIRED != 0,
            })
        })
        .collect()
}

pub fn encode_hashes(hashes: &[Hash]) -> Vec<u8> {
    hashes.iter().flat_map(|h| h.as_bytes().iter().copied()).collect()
}

pub fn decode_hashes(bytes: &[u8]) -> StateResult<Vec<Hash>> {
    if bytes.len() % HASH_LEN != 0 {
        return Err(StateError::Serialization(format!(
            "ticket list length {} is not a multiple of {}",
            bytes.len(),
            HASH_LEN
        )));
    }
    bytes
        .chunks_exact(HASH_LEN)
        .map(|chunk| {
            Hash::from_slice(chunk)
                .ok_or_else(|| StateError::Serialization("bad ticket hash".to_string()))
        })
        .collect()
}

/// Undo data of a block, read inside an open transaction.
pub fn read_undo(
    tx: &dyn ReadTransaction,
    ticket_type: TicketType,
    block: &Hash,
) -> StateResult<Option<Arc<[UndoTicketData]>>> {
    match tx.get(columns::TICKET_UNDO, &ticket_key(ticket_type, block))? {
        Some(bytes) => Ok(Some(Arc::from(decode_undo(&bytes)?))),
        None => Ok(None),
    }
}

/// Tickets that matured at a block, read inside an open transaction.
pub fn read_new_tickets(
    tx: &dyn ReadTransaction,
    ticket_type: TicketType,
    block: &Hash,
) -> StateResult<Option<Arc<[Hash]>>> {
    match tx.get(columns::NEW_TICKETS, &ticket_key(ticket_type, block))? {
        Some(bytes) => Ok(Some(Arc::from(decode_hashes(&bytes)?))),
        None => Ok(None),
    }
}

/// Ticket data storage.
pub struct TicketStore {
    storage: Arc<dyn Storage>,
}

impl TicketStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Store the ticket data of a connected block (batched version).
    pub fn put_batched(
        &self,
        batch: &mut WriteBatch,
        ticket_type: TicketType,
        block: &Hash,
        node: &StakeNode,
    ) {
        let key = ticket_key(ticket_type, block);
        batch.put(columns::TICKET_UNDO, key.clone(), encode_undo(&node.undo_data()));
        batch.put(columns::NEW_TICKETS, key, encode_hashes(&node.new_tickets()));
    }

    /// Store the ticket data of a connected block.
    pub fn put(&self, ticket_type: TicketType, block: &Hash, node: &StakeNode) -> StateResult<()> {
        let mut batch = WriteBatch::new();
        self.put_batched(&mut batch, ticket_type, block, node);
        self.storage.write_batch(batch)?;
        Ok(())
    }

    /// Remove the ticket data of a block (batched version).
    pub fn delete_batched(&self, batch: &mut WriteBatch, ticket_type: TicketType, block: &Hash) {
        let key = ticket_key(ticket_type, block);
        batch.delete(columns::TICKET_UNDO, key.clone());
        batch.delete(columns::NEW_TICKETS, key);
    }

    pub fn undo(
        &self,
        ticket_type: TicketType,
        block: &Hash,
    ) -> StateResult<Option<Arc<[UndoTicketData]>>> {
        with_read_tx(self.storage.as_ref(), |tx| read_undo(tx, ticket_type, block))
    }

    pub fn new_tickets(
        &self,
        ticket_type: TicketType,
        block: &Hash,
    ) -> StateResult<Option<Arc<[Hash]>>> {
        with_read_tx(self.storage.as_ref(), |tx| {
            read_new_tickets(tx, ticket_type, block)
        })
    }
}
