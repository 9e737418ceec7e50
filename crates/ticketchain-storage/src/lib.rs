//! # ticketchain-storage
//!
//! Storage layer for the ticketchain consensus core.
//!
//! Consensus code only depends on the abstract contract defined here:
//! - [`Storage`]: point reads, writes and atomic batches over column families
//! - [`ReadTransaction`]: a consistent read-only view, opened with [`with_read_tx`]
//!
//! Two backends are provided:
//! - [`MemoryDatabase`]: in-process tables, used by tests and embedders
//! - `Database`: RocksDB, behind the `rocksdb` cargo feature
//!
//! ## Column Families
//!
//! - `TicketUndo`: Per-block ticket pool undo data
//! - `NewTickets`: Per-block lists of tickets maturing into the live pool
//! - `Default`: Required by RocksDB, unused otherwise

mod batch;
mod column;
#[cfg(feature = "rocksdb")]
mod database;
mod error;
mod memory;

pub use batch::{BatchOp, WriteBatch};
pub use column::ColumnFamily;
#[cfg(feature = "rocksdb")]
pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use memory::MemoryDatabase;

/// Storage trait for abstracting database operations.
///
/// Implementations must allow several read transactions to be open at once.
pub trait Storage: Send + Sync {
    /// Get a value by key from a column family.
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Put a key-value pair into a column family.
    fn put(&self, cf: ColumnFamily, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Delete a key from a column family.
    fn delete(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<()>;

    /// Check if a key exists in a column family.
    fn contains(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(cf, key)?.is_some())
    }

    /// Execute a batch of writes atomically.
    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()>;

    /// Open a read-only transaction over a consistent view of the store.
    fn begin_read(&self) -> StorageResult<Box<dyn ReadTransaction + '_>>;
}

/// A read-only view of the store.
///
/// Every read through the same transaction observes the same state, regardless
/// of writes committed after the transaction was opened.
pub trait ReadTransaction {
    /// Get a value by key from a column family.
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Check if a key exists in a column family.
    fn contains(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(cf, key)?.is_some())
    }
}

/// Run `f` inside a read-only transaction.
///
/// The transaction is released when `f` returns. Errors from opening the
/// transaction are converted into the caller's error type.
pub fn with_read_tx<S, T, E, F>(storage: &S, f: F) -> Result<T, E>
where
    S: Storage + ?Sized,
    E: From<StorageError>,
    F: FnOnce(&dyn ReadTransaction) -> Result<T, E>,
{
    let tx = storage.begin_read()?;
    f(tx.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_read_tx_propagates_closure_result() {
        let db = MemoryDatabase::new();
        db.put(ColumnFamily::TicketUndo, b"k", b"v").unwrap();

        let value: StorageResult<Option<Vec<u8>>> =
            with_read_tx(&db, |tx| tx.get(ColumnFamily::TicketUndo, b"k"));
        assert_eq!(value.unwrap(), Some(b"v".to_vec()));

        let failed: StorageResult<()> =
            with_read_tx(&db, |_| Err(StorageError::Corruption("boom".into())));
        assert!(matches!(failed, Err(StorageError::Corruption(_))));
    }

    #[test]
    fn test_with_read_tx_on_trait_object() {
        let db = MemoryDatabase::new();
        let storage: &dyn Storage = &db;
        let present: StorageResult<bool> =
            with_read_tx(storage, |tx| tx.contains(ColumnFamily::TicketUndo, b"missing"));
        assert!(!present.unwrap());
    }
}
