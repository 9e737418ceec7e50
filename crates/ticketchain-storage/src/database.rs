//! RocksDB database implementation.

use crate::{BatchOp, ColumnFamily, ReadTransaction, Storage, StorageError, StorageResult, WriteBatch};
use rocksdb::{
    ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options, SnapshotWithThreadMode,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

type Db = DBWithThreadMode<MultiThreaded>;

/// RocksDB database wrapper.
///
/// Read transactions are RocksDB snapshots, so any number of them may be open
/// concurrently with writers.
#[derive(Clone)]
pub struct Database {
    db: Arc<Db>,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(256);
        opts.set_keep_log_file_num(1);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ColumnFamily::all()
            .iter()
            .map(|cf| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                ColumnFamilyDescriptor::new(cf.name(), cf_opts)
            })
            .collect();

        let db = Db::open_cf_descriptors(&opts, path, cf_descriptors)?;
        debug!("Database opened successfully");

        Ok(Self { db: Arc::new(db) })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> StorageResult<()> {
        for cf in ColumnFamily::all() {
            if let Some(handle) = self.db.cf_handle(cf.name()) {
                self.db.flush_cf(&handle)?;
            }
        }
        Ok(())
    }
}

fn missing_cf(cf: ColumnFamily) -> StorageError {
    StorageError::ColumnFamilyNotFound(cf.name().to_string())
}

impl Storage for Database {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let handle = self.db.cf_handle(cf.name()).ok_or_else(|| missing_cf(cf))?;
        Ok(self.db.get_cf(&handle, key)?)
    }

    fn put(&self, cf: ColumnFamily, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let handle = self.db.cf_handle(cf.name()).ok_or_else(|| missing_cf(cf))?;
        self.db.put_cf(&handle, key, value)?;
        Ok(())
    }

    fn delete(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<()> {
        let handle = self.db.cf_handle(cf.name()).ok_or_else(|| missing_cf(cf))?;
        self.db.delete_cf(&handle, key)?;
        Ok(())
    }

    fn write_batch(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut rocks_batch = rocksdb::WriteBatch::default();

        for op in batch.into_ops() {
            let cf = op.cf();
            let handle = self.db.cf_handle(cf.name()).ok_or_else(|| missing_cf(cf))?;
            match op {
                BatchOp::Put { key, value, .. } => rocks_batch.put_cf(&handle, key, value),
                BatchOp::Delete { key, .. } => rocks_batch.delete_cf(&handle, key),
            }
        }

        self.db.write(rocks_batch)?;
        Ok(())
    }

    fn begin_read(&self) -> StorageResult<Box<dyn ReadTransaction + '_>> {
        Ok(Box::new(SnapshotTx {
            db: &*self.db,
            snapshot: self.db.snapshot(),
        }))
    }
}

/// Read transaction pinned to a RocksDB snapshot.
struct SnapshotTx<'a> {
    db: &'a Db,
    snapshot: SnapshotWithThreadMode<'a, Db>,
}

impl ReadTransaction for SnapshotTx<'_> {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let handle = self.db.cf_handle(cf.name()).ok_or_else(|| missing_cf(cf))?;
        Ok(self.snapshot.get_cf(&handle, key)?)
    }
}
