//! The block indexer — extracts indexable attributes from a block's
//! transactions and writes them through the store.
//!
//! All entries for one block (or one batch of blocks) go through a single
//! write transaction: either every entry becomes visible or none does.
//! The transaction id written as every entry's value is the surrogate id
//! the ledger assigned; it is never recomputed here.

use std::sync::Arc;

use tracing::debug;

use ledgerindex_core::error::IndexError;
use ledgerindex_core::types::{Block, OutputInfo, Transaction};
use ledgerindex_store::{IndexDb, IndexStore, WriteTxn};

/// Writes one block's index entries atomically.
pub struct BlockIndexer {
    store: Arc<IndexStore>,
}

impl BlockIndexer {
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self { store }
    }

    /// Index one block (coinbase included in `txs`) in its own write
    /// transaction. Returns the number of entries written.
    ///
    /// On any failure the transaction is rolled back; no partial state
    /// for the block is ever observable.
    pub fn index_block(&self, block: &Block, txs: &[Transaction]) -> Result<u64, IndexError> {
        self.index_blocks(std::slice::from_ref(&(block.clone(), txs.to_vec())))
    }

    /// Index a batch of blocks in one write transaction.
    pub fn index_blocks(&self, batch: &[(Block, Vec<Transaction>)]) -> Result<u64, IndexError> {
        let mut txn = self.store.begin_write();
        for (block, txs) in batch {
            if let Err(e) = self.write_block(&mut txn, block, txs) {
                txn.abort();
                return Err(e);
            }
        }
        let written = txn.commit()?;
        debug!(
            blocks = batch.len(),
            entries = written,
            "block batch committed"
        );
        Ok(written)
    }

    /// Write one block's entries into a caller-scoped transaction.
    pub fn write_block(
        &self,
        txn: &mut WriteTxn<'_>,
        block: &Block,
        txs: &[Transaction],
    ) -> Result<u64, IndexError> {
        let before = txn.entries();
        for tx in txs {
            self.write_transaction(txn, block, tx)?;
        }
        Ok(txn.entries() - before)
    }

    fn write_transaction(
        &self,
        txn: &mut WriteTxn<'_>,
        block: &Block,
        tx: &Transaction,
    ) -> Result<(), IndexError> {
        let tx_id = tx.id.to_be_bytes();

        for key_image in &tx.key_images {
            txn.put(IndexDb::KeyImage, key_image.as_bytes(), &tx_id)?;
        }

        let ts_key = block.timestamp.to_be_bytes();
        for (index_in_tx, output) in tx.outputs.iter().enumerate() {
            txn.put(IndexDb::OutputKey, output.public_key.as_bytes(), &tx_id)?;
            txn.put(
                IndexDb::OutputAmount,
                output.public_key.as_bytes(),
                &output.amount.to_be_bytes(),
            )?;

            let info = OutputInfo {
                out_pub_key: output.public_key,
                tx_id: tx.id,
                tx_pub_key: tx.tx_pub_key,
                amount: output.amount,
                index_in_tx: index_in_tx as u32,
            };
            let value = bincode::serialize(&info).map_err(|e| IndexError::Encode {
                what: "output info",
                reason: e.to_string(),
            })?;
            txn.put(IndexDb::OutputInfo, &ts_key, &value)?;
        }

        txn.put(IndexDb::TxPubKey, tx.tx_pub_key.as_bytes(), &tx_id)?;

        // Payment ids are evaluated independently of each other; either
        // may be absent or carry its NULL sentinel, and only real values
        // get indexed.
        if let Some(payment_id) = tx.payment_id {
            if !payment_id.is_null() {
                txn.put(IndexDb::PaymentId, payment_id.as_bytes(), &tx_id)?;
            }
        }
        if let Some(encrypted) = tx.encrypted_payment_id {
            if !encrypted.is_null() {
                txn.put(IndexDb::EncryptedPaymentId, encrypted.as_bytes(), &tx_id)?;
            }
        }

        Ok(())
    }
}
