//! Access to block transactions for matured-ticket discovery.

use crate::error::StateResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use ticketchain_consensus::{Hash, Transaction};

/// Supplies the regular transactions of a block by hash.
pub trait BlockSource: Send + Sync {
    /// `None` when the block body is unknown.
    fn fetch_transactions(&self, block: &Hash) -> StateResult<Option<Arc<[Transaction]>>>;
}

/// Block bodies held in memory.
#[derive(Default)]
pub struct MemoryBlockSource {
    blocks: RwLock<HashMap<Hash, Arc<[Transaction]>>>,
}

impl MemoryBlockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, block: Hash, transactions: Vec<Transaction>) {
        self.blocks.write().insert(block, Arc::from(transactions));
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl BlockSource for MemoryBlockSource {
    fn fetch_transactions(&self, block: &Hash) -> StateResult<Option<Arc<[Transaction]>>> {
        Ok(self.blocks.read().get(block).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_block_source() {
        let source = MemoryBlockSource::new();
        let block = Hash::digest(b"block");
        assert!(source.fetch_transactions(&block).unwrap().is_none());

        source.insert(block, vec![Transaction::default(), Transaction::default()]);
        assert_eq!(source.len(), 1);
        let txs = source.fetch_transactions(&block).unwrap().unwrap();
        assert_eq!(txs.len(), 2);
    }
}
