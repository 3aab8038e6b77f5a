//! Point and range queries over the index store.
//!
//! Every call opens its own snapshot transaction, so queries run
//! concurrently with indexing and observe a consistent store state.
//! An absent key is `Ok(None)` or an empty vector, never an error.

use std::collections::BTreeSet;
use std::sync::Arc;

use ledgerindex_core::error::{QueryError, StorageError};
use ledgerindex_core::ledger::Ledger;
use ledgerindex_core::types::{
    EncryptedPaymentId, KeyImage, OutputInfo, PaymentId, PublicKey, TxId,
};
use ledgerindex_store::{IndexDb, IndexStore, ReadTxn, ScanMode};

/// Read-side API over the indexed attributes.
pub struct QueryEngine {
    store: Arc<IndexStore>,
    ledger: Arc<dyn Ledger>,
}

impl QueryEngine {
    pub fn new(store: Arc<IndexStore>, ledger: Arc<dyn Ledger>) -> Self {
        Self { store, ledger }
    }

    /// Every transaction id stored under `key` in `db`, in insertion
    /// order. Duplicates are preserved.
    pub fn exact_lookup(&self, db: IndexDb, key: &[u8]) -> Result<Vec<TxId>, StorageError> {
        let read = self.store.begin_read();
        let mut ids = Vec::new();
        for entry in read.scan(db, key, ScanMode::Exact)? {
            ids.push(decode_tx_id(db, &entry?.value)?);
        }
        Ok(ids)
    }

    /// Transactions that spent `key_image`. More than one id means the
    /// ledger recorded (or the index replayed) a duplicate spend.
    pub fn key_image_lookup(&self, key_image: &KeyImage) -> Result<Vec<TxId>, StorageError> {
        self.exact_lookup(IndexDb::KeyImage, key_image.as_bytes())
    }

    /// Transactions that created an output with `public_key`.
    pub fn output_key_lookup(&self, public_key: &PublicKey) -> Result<Vec<TxId>, StorageError> {
        self.exact_lookup(IndexDb::OutputKey, public_key.as_bytes())
    }

    /// Transactions carrying `tx_pub_key` as their transaction public key.
    pub fn tx_pub_key_lookup(&self, tx_pub_key: &PublicKey) -> Result<Vec<TxId>, StorageError> {
        self.exact_lookup(IndexDb::TxPubKey, tx_pub_key.as_bytes())
    }

    /// Transactions tagged with the plaintext `payment_id`.
    pub fn payment_id_lookup(&self, payment_id: &PaymentId) -> Result<Vec<TxId>, StorageError> {
        self.exact_lookup(IndexDb::PaymentId, payment_id.as_bytes())
    }

    /// Transactions tagged with the encrypted `payment_id`.
    pub fn encrypted_payment_id_lookup(
        &self,
        payment_id: &EncryptedPaymentId,
    ) -> Result<Vec<TxId>, StorageError> {
        self.exact_lookup(IndexDb::EncryptedPaymentId, payment_id.as_bytes())
    }

    /// Amount of the output identified by `public_key`, if indexed.
    pub fn amount_lookup(&self, public_key: &PublicKey) -> Result<Option<u64>, StorageError> {
        let read = self.store.begin_read();
        match read.get_first(IndexDb::OutputAmount, public_key.as_bytes())? {
            None => Ok(None),
            Some(value) => Ok(Some(u64::from_be_bytes(value.as_slice().try_into().map_err(
                |_| StorageError::Corrupt {
                    db: IndexDb::OutputAmount.name(),
                    reason: format!("amount value of {} bytes, expected 8", value.len()),
                },
            )?))),
        }
    }

    /// Every output created in a block whose timestamp falls within
    /// `ts_start..=ts_end`, as `(timestamp, info)` pairs in timestamp
    /// order (insertion order within one timestamp).
    pub fn range_lookup(
        &self,
        ts_start: u64,
        ts_end: u64,
    ) -> Result<Vec<(u64, OutputInfo)>, StorageError> {
        let read = self.store.begin_read();
        let mut out = Vec::new();
        for entry in read.scan(IndexDb::OutputInfo, &ts_start.to_be_bytes(), ScanMode::RangeFrom)? {
            let entry = entry?;
            let ts = decode_timestamp(&entry.key)?;
            if ts > ts_end {
                break;
            }
            let info: OutputInfo =
                bincode::deserialize(&entry.value).map_err(|e| StorageError::Corrupt {
                    db: IndexDb::OutputInfo.name(),
                    reason: format!("undecodable output info: {e}"),
                })?;
            out.push((ts, info));
        }
        Ok(out)
    }

    /// Distinct transactions that created outputs in the timestamp range,
    /// sorted by id. A transaction re-indexed after a checkpoint rollback
    /// appears once.
    pub fn unique_transactions_in_range(
        &self,
        ts_start: u64,
        ts_end: u64,
    ) -> Result<Vec<TxId>, StorageError> {
        let mut seen = BTreeSet::new();
        for (ts, info) in self.range_lookup(ts_start, ts_end)? {
            seen.insert((ts, info.tx_id));
        }
        // Surrogate ids are assigned externally and need not be monotonic
        // with timestamp, so the projection re-sorts by id.
        let ids: BTreeSet<TxId> = seen.into_iter().map(|(_, id)| id).collect();
        Ok(ids.into_iter().collect())
    }

    /// Height of a block carrying `timestamp`, resolved through the first
    /// output indexed at that timestamp and the ledger's transaction map.
    pub async fn block_height_for_timestamp(
        &self,
        timestamp: u64,
    ) -> Result<Option<u64>, QueryError> {
        let first = {
            let read: ReadTxn<'_> = self.store.begin_read();
            let mut scan = read.scan(IndexDb::OutputInfo, &timestamp.to_be_bytes(), ScanMode::Exact)?;
            match scan.next() {
                None => return Ok(None),
                Some(entry) => entry?,
            }
        };
        let info: OutputInfo =
            bincode::deserialize(&first.value).map_err(|e| StorageError::Corrupt {
                db: IndexDb::OutputInfo.name(),
                reason: format!("undecodable output info: {e}"),
            })?;
        Ok(self.ledger.block_height_of(info.tx_id).await?)
    }
}

fn decode_tx_id(db: IndexDb, value: &[u8]) -> Result<TxId, StorageError> {
    let bytes: [u8; 8] = value.try_into().map_err(|_| StorageError::Corrupt {
        db: db.name(),
        reason: format!("transaction id of {} bytes, expected 8", value.len()),
    })?;
    Ok(TxId::from_be_bytes(bytes))
}

fn decode_timestamp(key: &[u8]) -> Result<u64, StorageError> {
    let bytes: [u8; 8] = key.try_into().map_err(|_| StorageError::Corrupt {
        db: IndexDb::OutputInfo.name(),
        reason: format!("timestamp key of {} bytes, expected 8", key.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}
