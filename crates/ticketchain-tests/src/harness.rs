//! Test harness for integration tests.
//!
//! Provides test databases, a storage wrapper that counts reads and a chain
//! builder that grows a block tree with real ticket purchases and votes.

use crate::generators::{payment, ticket_purchase};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ticketchain_consensus::{
    AiTickets, ChainParams, Hash, Header, RegularTickets, ScriptClass, StakeDifficultyCalculator,
    TicketKind, TicketType, Transaction, WorkDifficultyCalculator,
};
use ticketchain_state::{
    BlockIndex, MemoryBlockSource, NodeId, StakeNode, StakeNodeResolver, StakeSpends, StateResult,
    TicketStore,
};
use ticketchain_storage::{
    ColumnFamily, MemoryDatabase, ReadTransaction, Storage, StorageResult, WriteBatch,
};

/// Timestamp of every test genesis block.
pub const GENESIS_TIME: i64 = 1_600_000_000;

/// Test database wrapper that cleans up on drop.
#[cfg(feature = "rocksdb")]
pub struct TestDatabase {
    db: ticketchain_storage::Database,
    _temp_dir: tempfile::TempDir,
}

#[cfg(feature = "rocksdb")]
impl TestDatabase {
    /// Create a new test database in a temporary directory.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp directory");
        let db = ticketchain_storage::Database::open(temp_dir.path())
            .expect("Failed to open database");
        Self {
            db,
            _temp_dir: temp_dir,
        }
    }
}

#[cfg(feature = "rocksdb")]
impl std::ops::Deref for TestDatabase {
    type Target = ticketchain_storage::Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Storage wrapper counting point reads, including those made through read
/// transactions.
pub struct CountingStorage<S> {
    inner: S,
    reads: AtomicUsize,
    read_txs: AtomicUsize,
}

impl<S: Storage> CountingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            read_txs: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn read_txs(&self) -> usize {
        self.read_txs.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Storage> Storage for CountingStorage<S> {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(cf, key)
    }

    fn put(&self, cf: ColumnFamily, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.inner.put(cf, key, value)
    }

    fn delete(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<()> {
        self.inner.delete(cf, key)
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        self.inner.write_batch(batch)
    }

    fn begin_read(&self) -> StorageResult<Box<dyn ReadTransaction + '_>> {
        self.read_txs.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(CountingReadTx {
            inner: self.inner.begin_read()?,
            reads: &self.reads,
        }))
    }
}

struct CountingReadTx<'a> {
    inner: Box<dyn ReadTransaction + 'a>,
    reads: &'a AtomicUsize,
}

impl ReadTransaction for CountingReadTx<'_> {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(cf, key)
    }
}

/// Simnet parameters shrunk so that both ticket types mature, vote and
/// expire within a few dozen blocks.
pub fn test_params() -> ChainParams {
    let mut params = ChainParams::simnet();

    let tickets = &mut params.tickets;
    tickets.ticket_pool_size = 16;
    tickets.ticket_maturity = 4;
    tickets.ticket_expiry = 24;
    tickets.tickets_per_block = 3;
    tickets.max_fresh_stake_per_block = 8;
    tickets.stake_diff_window_size = 4;
    tickets.stake_diff_start_height = 5;
    tickets.stake_enabled_height = 8;
    tickets.stake_validation_height = 16;

    let ai = &mut params.ai_tickets;
    ai.ticket_pool_size = 8;
    ai.ticket_maturity = 4;
    ai.ticket_expiry = 12;
    ai.tickets_per_block = 1;
    ai.max_fresh_stake_per_block = 4;
    ai.stake_diff_window_size = 4;
    ai.activation_height = 20;
    ai.stake_diff_start_height = 20;
    ai.stake_enabled_height = 24;
    ai.stake_validation_height = 28;

    params.validate().expect("test parameters must validate");
    params
}

/// Contents of a block added by [`ChainBuilder::extend`].
#[derive(Debug, Clone)]
pub struct BlockTemplate {
    /// Regular ticket purchases.
    pub regular_buys: u8,
    /// AI ticket purchases, ignored before AI activation.
    pub ai_buys: u8,
    /// Winners that vote; `None` votes with all of them.
    pub votes: Option<usize>,
    /// Revoke every missed ticket of the parent.
    pub revoke_missed: bool,
    /// Distinguishes blocks at the same height on different branches.
    pub salt: u32,
}

impl Default for BlockTemplate {
    fn default() -> Self {
        Self {
            regular_buys: 3,
            ai_buys: 1,
            votes: None,
            revoke_missed: false,
            salt: 0,
        }
    }
}

impl BlockTemplate {
    pub fn salted(salt: u32) -> Self {
        Self {
            salt,
            ..Default::default()
        }
    }
}

/// Grows a block tree whose blocks follow the ticket rules.
pub struct ChainBuilder {
    pub params: ChainParams,
    pub index: BlockIndex,
    pub storage: Arc<CountingStorage<MemoryDatabase>>,
    pub blocks: MemoryBlockSource,
    tickets: TicketStore,
}

impl ChainBuilder {
    pub fn new(params: ChainParams) -> Self {
        let mut index = BlockIndex::new();
        let genesis = Header {
            bits: params.pow_limit_bits,
            timestamp: GENESIS_TIME,
            ..Default::default()
        };
        let blocks = MemoryBlockSource::new();
        blocks.insert(genesis.hash(), Vec::new());
        index
            .insert(genesis, StakeSpends::default(), StakeSpends::default())
            .expect("genesis must insert");

        let storage = Arc::new(CountingStorage::new(MemoryDatabase::new()));
        let tickets = TicketStore::new(storage.clone());
        Self {
            params,
            index,
            storage,
            blocks,
            tickets,
        }
    }

    pub fn genesis(&self) -> NodeId {
        self.index.genesis().expect("builder always has genesis")
    }

    pub fn resolver<K: TicketKind>(&self) -> StakeNodeResolver<'_, K> {
        StakeNodeResolver::new(&self.params, &self.index, self.storage.as_ref(), &self.blocks)
    }

    pub fn try_stake_node<K: TicketKind>(&self, id: NodeId) -> StateResult<Arc<StakeNode>> {
        self.resolver::<K>().fetch_stake_node(id)
    }

    pub fn stake_node<K: TicketKind>(&self, id: NodeId) -> Arc<StakeNode> {
        self.try_stake_node::<K>(id)
            .expect("stake node must resolve")
    }

    pub fn hash(&self, id: NodeId) -> Hash {
        self.index.node(id).hash()
    }

    /// Add a child of `parent` built from `template`.
    pub fn extend(&mut self, parent: NodeId, template: &BlockTemplate) -> NodeId {
        let regular = self.stake_node::<RegularTickets>(parent);
        let ai = self.stake_node::<AiTickets>(parent);

        let parent_header = self.index.node(parent).header().clone();
        let height = parent_header.height as i64 + 1;
        let timestamp = parent_header.timestamp + self.params.target_time_per_block;

        let regular_spends = spends(&regular, template);
        let ai_spends = spends(&ai, template);

        let mut txs: Vec<Transaction> = vec![payment(&format!("pay-{}-{}", height, template.salt))];
        for n in 0..template.regular_buys {
            txs.push(ticket_purchase(
                ScriptClass::StakeSubmission,
                &format!("regular-{}-{}-{}", height, template.salt, n),
                1 + n as u32 % 2,
            ));
        }
        let ai_buys = if height >= self.params.ai_tickets.activation_height {
            template.ai_buys
        } else {
            0
        };
        for n in 0..ai_buys {
            txs.push(ticket_purchase(
                ScriptClass::AiStakeSubmission,
                &format!("ai-{}-{}-{}", height, template.salt, n),
                1,
            ));
        }

        let header = Header {
            version: 1,
            prev_block: parent_header.hash(),
            merkle_root: Hash::digest(&txs.iter().flat_map(|tx| tx.to_bytes()).collect::<Vec<_>>()),
            bits: WorkDifficultyCalculator::new(&self.params).calc_next_required_difficulty(
                &self.index,
                Some(parent),
                timestamp,
            ),
            sbits: StakeDifficultyCalculator::<RegularTickets>::new(&self.params)
                .calc_next_required_stake_difficulty(&self.index, Some(parent)),
            height: height as u32,
            timestamp,
            voters: regular_spends.voted.len() as u16,
            fresh_stake: template.regular_buys,
            revocations: regular_spends.revoked.len() as u8,
            pool_size: regular.pool_size() as u32,
            ai_sbits: StakeDifficultyCalculator::<AiTickets>::new(&self.params)
                .calc_next_required_stake_difficulty(&self.index, Some(parent)),
            ai_fresh_stake: ai_buys,
            ai_pool_size: ai.pool_size() as u32,
            nonce: template.salt,
        };
        self.blocks.insert(header.hash(), txs);
        self.index
            .insert(header, regular_spends, ai_spends)
            .expect("built block must extend the tree")
    }

    /// Extend `from` by `len` blocks, returning `from` followed by the new
    /// blocks.
    pub fn chain(&mut self, from: NodeId, len: usize, template: &BlockTemplate) -> Vec<NodeId> {
        let mut ids = vec![from];
        for _ in 0..len {
            let tip = *ids.last().expect("ids start non-empty");
            ids.push(self.extend(tip, template));
        }
        ids
    }

    /// Write ticket data of `ids` as block connection would.
    pub fn persist(&self, ids: &[NodeId]) {
        let mut batch = WriteBatch::new();
        for &id in ids {
            let hash = self.hash(id);
            self.tickets.put_batched(
                &mut batch,
                TicketType::Regular,
                &hash,
                &self.stake_node::<RegularTickets>(id),
            );
            self.tickets
                .put_batched(&mut batch, TicketType::Ai, &hash, &self.stake_node::<AiTickets>(id));
        }
        self.storage
            .write_batch(batch)
            .expect("memory writes cannot fail");
    }

    pub fn evict(&mut self, ids: &[NodeId]) {
        for &id in ids {
            self.index.evict_stake_data(id);
        }
    }

    pub fn evict_all(&mut self) {
        for id in 0..self.index.len() as u32 {
            self.index.evict_stake_data(NodeId(id));
        }
    }

    pub fn tickets(&self) -> &TicketStore {
        &self.tickets
    }
}

fn spends(parent: &StakeNode, template: &BlockTemplate) -> StakeSpends {
    let winners = parent.winners();
    let votes = template.votes.unwrap_or(winners.len()).min(winners.len());
    let revoked = if template.revoke_missed {
        parent.missed_tickets().keys().copied().collect()
    } else {
        Vec::new()
    };
    StakeSpends {
        voted: winners[..votes].to_vec(),
        revoked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketchain_consensus::compact_to_big;

    #[test]
    fn test_counting_storage_counts_transaction_reads() {
        let storage = CountingStorage::new(MemoryDatabase::new());
        storage.put(ColumnFamily::TicketUndo, b"k", b"v").unwrap();
        assert_eq!(storage.get(ColumnFamily::TicketUndo, b"k").unwrap(), Some(b"v".to_vec()));
        {
            let tx = storage.begin_read().unwrap();
            assert!(tx.get(ColumnFamily::TicketUndo, b"missing").unwrap().is_none());
        }
        assert_eq!(storage.reads(), 2);
        assert_eq!(storage.read_txs(), 1);
    }

    #[test]
    fn test_builder_headers_follow_rules() {
        let mut builder = ChainBuilder::new(test_params());
        let genesis = builder.genesis();
        let ids = builder.chain(genesis, 24, &BlockTemplate::default());
        let tip = builder.index.node(ids[24]).header().clone();

        assert_eq!(tip.height, 24);
        assert!(compact_to_big(tip.bits) <= builder.params.pow_limit);
        assert_eq!(tip.voters, 3);
        assert!(tip.sbits >= builder.params.tickets.minimum_stake_diff);
        assert_eq!(tip.ai_fresh_stake, 1);
        assert_eq!(builder.index.node(ids[19]).header().ai_fresh_stake, 0);
    }
}
