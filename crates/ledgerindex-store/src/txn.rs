//! Write and read transactions over the index environment.
//!
//! A [`WriteTxn`] buffers every put in a RocksDB `WriteBatch` and applies
//! it in one atomic write on commit; dropping the transaction discards the
//! batch. The store's writer gate travels with the transaction, so a
//! second `begin_write` blocks until the first commits or aborts.
//!
//! A [`ReadTxn`] pins a RocksDB snapshot. Everything read through it —
//! point lookups and cursors alike — observes the store exactly as of
//! `begin_read`, regardless of what the writer commits meanwhile.

use parking_lot::MutexGuard;
use rocksdb::{Direction, IteratorMode, WriteBatch, DB};

use ledgerindex_core::error::StorageError;

use crate::registry::{DbKind, IndexDb, NEXT_SEQ_KEY};
use crate::store::IndexStore;

/// Width of the sequence suffix appended to duplicate-sorted keys.
const SEQ_LEN: usize = 8;

// ─── WriteTxn ─────────────────────────────────────────────────────────────────

/// The single write transaction.
pub struct WriteTxn<'s> {
    store: &'s IndexStore,
    batch: WriteBatch,
    next_seq: u64,
    entries: u64,
    _gate: MutexGuard<'s, ()>,
}

impl<'s> WriteTxn<'s> {
    pub(crate) fn new(store: &'s IndexStore, gate: MutexGuard<'s, ()>, next_seq: u64) -> Self {
        Self {
            store,
            batch: WriteBatch::default(),
            next_seq,
            entries: 0,
            _gate: gate,
        }
    }

    /// Buffer one entry.
    ///
    /// On a duplicate-sorted sub-database this appends another value under
    /// `key`, preserving insertion order; on a single-valued one it
    /// replaces any previous value.
    pub fn put(&mut self, db: IndexDb, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.store.cf(db)?;
        match db.kind() {
            DbKind::Single => self.batch.put_cf(cf, key, value),
            DbKind::DupSorted => {
                let mut composite = Vec::with_capacity(key.len() + SEQ_LEN);
                composite.extend_from_slice(key);
                composite.extend_from_slice(&self.next_seq.to_be_bytes());
                self.next_seq += 1;
                self.batch.put_cf(cf, &composite, value);
            }
        }
        self.entries += 1;
        Ok(())
    }

    /// Entries buffered so far.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Atomically apply every buffered entry. Returns the entry count.
    ///
    /// The advanced sequence counter rides in the same batch, so entries
    /// and counter always commit together.
    pub fn commit(self) -> Result<u64, StorageError> {
        let meta = self.store.meta_cf()?;
        let mut batch = self.batch;
        batch.put_cf(meta, NEXT_SEQ_KEY, self.next_seq.to_be_bytes());

        self.store
            .db
            .write_opt(batch, &self.store.write_opts())
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        self.store
            .next_seq
            .store(self.next_seq, std::sync::atomic::Ordering::SeqCst);
        Ok(self.entries)
    }

    /// Discard every buffered entry. Equivalent to dropping the
    /// transaction; spelled out for call sites that roll back on error.
    pub fn abort(self) {}
}

// ─── ReadTxn ──────────────────────────────────────────────────────────────────

/// Cursor positioning mode for [`ReadTxn::scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Enumerate only the values stored under exactly the given key.
    Exact,
    /// Position at the first key ≥ the given key, then enumerate all
    /// subsequent entries in key order until the caller stops.
    RangeFrom,
}

/// One entry yielded by a [`Scan`]: the logical key (sequence suffix
/// stripped) and the stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// A snapshot-isolated read transaction.
pub struct ReadTxn<'s> {
    store: &'s IndexStore,
    snapshot: rocksdb::Snapshot<'s>,
}

impl<'s> ReadTxn<'s> {
    pub(crate) fn new(store: &'s IndexStore) -> Self {
        Self {
            store,
            snapshot: store.db.snapshot(),
        }
    }

    /// First value stored under `key`, or `None` if the key is absent.
    /// Absence is not an error.
    pub fn get_first(&self, db: IndexDb, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        match db.kind() {
            DbKind::Single => self
                .snapshot
                .get_cf(self.store.cf(db)?, key)
                .map_err(|e| StorageError::Backend(e.to_string())),
            DbKind::DupSorted => match self.scan(db, key, ScanMode::Exact)?.next() {
                None => Ok(None),
                Some(Ok(entry)) => Ok(Some(entry.value)),
                Some(Err(e)) => Err(e),
            },
        }
    }

    /// Open a cursor on `db`, positioned per `mode`.
    pub fn scan<'t>(
        &'t self,
        db: IndexDb,
        key: &[u8],
        mode: ScanMode,
    ) -> Result<Scan<'t>, StorageError> {
        let cf = self.store.cf(db)?;
        let inner = self
            .snapshot
            .iterator_cf(cf, IteratorMode::From(key, Direction::Forward));
        Ok(Scan {
            inner,
            mode,
            start: key.to_vec(),
            suffix: match db.kind() {
                DbKind::Single => 0,
                DbKind::DupSorted => SEQ_LEN,
            },
            db,
            done: false,
        })
    }
}

/// Forward cursor over one sub-database.
///
/// Yields logical keys with the duplicate-sequence suffix already
/// stripped, in the store's byte order — which for the fixed-width
/// big-endian keys used throughout equals numeric order.
pub struct Scan<'t> {
    inner: rocksdb::DBIteratorWithThreadMode<'t, DB>,
    mode: ScanMode,
    start: Vec<u8>,
    suffix: usize,
    db: IndexDb,
    done: bool,
}

impl Iterator for Scan<'_> {
    type Item = Result<ScanEntry, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (key, value) = match self.inner.next()? {
            Ok(kv) => kv,
            Err(e) => {
                self.done = true;
                return Some(Err(StorageError::Backend(e.to_string())));
            }
        };
        if key.len() < self.suffix {
            self.done = true;
            return Some(Err(StorageError::Corrupt {
                db: self.db.name(),
                reason: format!("key of {} bytes is shorter than its suffix", key.len()),
            }));
        }
        let logical = &key[..key.len() - self.suffix];
        if self.mode == ScanMode::Exact && logical != self.start.as_slice() {
            self.done = true;
            return None;
        }
        Some(Ok(ScanEntry {
            key: logical.to_vec(),
            value: value.into_vec(),
        }))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
