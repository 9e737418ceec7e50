//! In-memory storage backend.

use crate::{BatchOp, ColumnFamily, ReadTransaction, Storage, StorageResult, WriteBatch};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::trace;

type Tables = HashMap<ColumnFamily, BTreeMap<Vec<u8>, Vec<u8>>>;

/// Storage backed by in-process ordered maps.
///
/// Clones share the same tables. Read transactions hold a shared lock for
/// their lifetime, so writers wait until every open transaction is dropped.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDatabase {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys stored in a column family.
    pub fn len(&self, cf: ColumnFamily) -> usize {
        self.tables.read().get(&cf).map_or(0, BTreeMap::len)
    }

    /// Whether a column family holds no keys.
    pub fn is_empty(&self, cf: ColumnFamily) -> bool {
        self.len(cf) == 0
    }
}

fn apply(tables: &mut Tables, op: BatchOp) {
    match op {
        BatchOp::Put { cf, key, value } => {
            tables.entry(cf).or_default().insert(key, value);
        }
        BatchOp::Delete { cf, key } => {
            if let Some(table) = tables.get_mut(&cf) {
                table.remove(&key);
            }
        }
    }
}

impl Storage for MemoryDatabase {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self
            .tables
            .read()
            .get(&cf)
            .and_then(|table| table.get(key).cloned()))
    }

    fn put(&self, cf: ColumnFamily, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tables
            .write()
            .entry(cf)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<()> {
        if let Some(table) = self.tables.write().get_mut(&cf) {
            table.remove(key);
        }
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let ops = batch.into_ops();
        trace!(ops = ops.len(), "Applying memory write batch");
        let mut tables = self.tables.write();
        for op in ops {
            apply(&mut tables, op);
        }
        Ok(())
    }

    fn begin_read(&self) -> StorageResult<Box<dyn ReadTransaction + '_>> {
        Ok(Box::new(MemoryReadTx {
            tables: self.tables.read(),
        }))
    }
}

/// Read transaction over a [`MemoryDatabase`].
struct MemoryReadTx<'a> {
    tables: RwLockReadGuard<'a, Tables>,
}

impl ReadTransaction for MemoryReadTx<'_> {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.tables.get(&cf).and_then(|table| table.get(key).cloned()))
    }
}
