//! The index store environment: one RocksDB database, a fixed set of
//! column families, a single-writer gate, and the duplicate-sequence
//! counter.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteOptions, DB};
use tracing::{debug, info};

use ledgerindex_core::error::StorageError;

use crate::registry::{IndexDb, CF_META, NEXT_SEQ_KEY};
use crate::txn::{ReadTxn, WriteTxn};

/// Configuration for opening an [`IndexStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory of the environment.
    pub path: PathBuf,
    /// Memtable size in bytes.
    pub write_buffer_size: usize,
    /// Block cache size in bytes.
    pub block_cache_size: usize,
    /// Maximum number of memtables.
    pub max_write_buffer_number: i32,
    /// fsync every commit. Durable checkpoints depend on this.
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/index"),
            write_buffer_size: 64 * 1024 * 1024,
            block_cache_size: 256 * 1024 * 1024,
            max_write_buffer_number: 3,
            sync_writes: true,
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Small buffers, no fsync. For tests only.
    pub fn for_testing(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_buffer_size: 4 * 1024 * 1024,
            block_cache_size: 8 * 1024 * 1024,
            max_write_buffer_number: 2,
            sync_writes: false,
        }
    }
}

/// The transactional environment holding every sub-database.
///
/// Opened once at process start and kept open for the process lifetime.
/// At most one [`WriteTxn`] exists at a time (later writers block); any
/// number of [`ReadTxn`] snapshots run concurrently with the writer and
/// with each other.
pub struct IndexStore {
    pub(crate) db: DB,
    /// Next sequence number for duplicate-sorted entries. Mirrors the
    /// value persisted in the meta column family; only the committing
    /// writer advances it.
    pub(crate) next_seq: AtomicU64,
    pub(crate) writer_gate: Mutex<()>,
    sync_writes: bool,
}

impl IndexStore {
    /// Open (or create) the environment at `config.path`.
    ///
    /// Creates all registered sub-databases on first open and validates
    /// their handles on every open.
    pub fn open(config: StoreConfig) -> Result<Self, StorageError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = IndexDb::ALL
            .iter()
            .map(|db| db.name())
            .chain(std::iter::once(CF_META))
            .map(|name| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Snappy);
                ColumnFamilyDescriptor::new(name, cf_opts)
            })
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors).map_err(|e| {
            StorageError::Open {
                path: config.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        let store = Self {
            db,
            next_seq: AtomicU64::new(0),
            writer_gate: Mutex::new(()),
            sync_writes: config.sync_writes,
        };

        // Validate the whole registry up front; a missing handle here is
        // an environment-level failure, not something a query should hit.
        for idx_db in IndexDb::ALL {
            store.cf(idx_db)?;
        }

        let next_seq = store.load_next_seq()?;
        store.next_seq.store(next_seq, Ordering::SeqCst);

        info!(
            path = %config.path.display(),
            sub_databases = IndexDb::ALL.len(),
            next_seq,
            "index store opened"
        );
        Ok(store)
    }

    /// Begin the (single) write transaction. Blocks while another writer
    /// is active. Commit or drop (= abort) before beginning another from
    /// the same thread.
    pub fn begin_write(&self) -> WriteTxn<'_> {
        let guard = self.writer_gate.lock();
        let next_seq = self.next_seq.load(Ordering::SeqCst);
        debug!(next_seq, "write transaction begun");
        WriteTxn::new(self, guard, next_seq)
    }

    /// Begin a read-only snapshot transaction. Observes the store as of
    /// this call; concurrent commits stay invisible to it.
    pub fn begin_read(&self) -> ReadTxn<'_> {
        ReadTxn::new(self)
    }

    pub(crate) fn cf(&self, db: IndexDb) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(db.name())
            .ok_or(StorageError::MissingDatabase(db.name()))
    }

    pub(crate) fn meta_cf(&self) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(CF_META)
            .ok_or(StorageError::MissingDatabase(CF_META))
    }

    pub(crate) fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync_writes);
        opts
    }

    fn load_next_seq(&self) -> Result<u64, StorageError> {
        let meta = self.meta_cf()?;
        match self
            .db
            .get_cf(meta, NEXT_SEQ_KEY)
            .map_err(|e| StorageError::Backend(e.to_string()))?
        {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    StorageError::Corrupt {
                        db: CF_META,
                        reason: format!("sequence counter has {} bytes, want 8", bytes.len()),
                    }
                })?;
                Ok(u64::from_be_bytes(arr))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_all_sub_databases() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(StoreConfig::for_testing(dir.path())).unwrap();
        for db in IndexDb::ALL {
            assert!(store.cf(db).is_ok());
        }
        assert!(store.meta_cf().is_ok());
    }

    #[test]
    fn open_fails_on_unusable_path() {
        // A file, not a directory.
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = IndexStore::open(StoreConfig::for_testing(file.path()));
        assert!(matches!(result, Err(StorageError::Open { .. })));
    }

    #[test]
    fn fresh_store_starts_at_sequence_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::open(StoreConfig::for_testing(dir.path())).unwrap();
        assert_eq!(store.next_seq.load(Ordering::SeqCst), 0);
    }
}
