//! The `Ledger` collaborator trait — the read-only, authoritative source of
//! blocks and transactions being indexed.
//!
//! The indexer never parses or validates raw ledger data itself; it asks
//! the ledger for blocks and already-parsed transactions, and uses the
//! ledger-assigned surrogate ids verbatim.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::LedgerFetchError;
use crate::types::{Block, Transaction, TxHash, TxId};

/// Read-only access to the ledger being indexed.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current chain height (number of blocks; the top block sits at
    /// `height − 1`).
    async fn chain_height(&self) -> Result<u64, LedgerFetchError>;

    /// The block at `height`. `BlockNotAvailable` when it does not exist
    /// yet — a transient condition, retried by the loop.
    async fn block_at_height(&self, height: u64) -> Result<Block, LedgerFetchError>;

    /// Resolve a block's transactions (coinbase included). Returns the
    /// transactions found plus the hashes still missing (e.g. still
    /// propagating); a non-empty missing set makes the caller retry later.
    async fn transactions_for(
        &self,
        block: &Block,
    ) -> Result<(Vec<Transaction>, Vec<TxHash>), LedgerFetchError>;

    /// The surrogate id the ledger assigned to `hash`.
    async fn transaction_id_of(&self, hash: &TxHash) -> Result<TxId, LedgerFetchError>;

    /// Height of the block containing transaction `id`, if any.
    async fn block_height_of(&self, id: TxId) -> Result<Option<u64>, LedgerFetchError>;
}

// ─── In-memory ledger (for testing) ───────────────────────────────────────────

#[derive(Default)]
struct MemoryLedgerInner {
    blocks: BTreeMap<u64, Block>,
    transactions: HashMap<TxHash, Transaction>,
    tx_heights: HashMap<TxId, u64>,
}

/// In-memory `Ledger` for tests and embedders.
///
/// Blocks are pushed fully formed; surrogate ids come with the pushed
/// transactions, mirroring how a real ledger assigns them.
#[derive(Default)]
pub struct MemoryLedger {
    inner: Mutex<MemoryLedgerInner>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block and its transactions (coinbase first in `txs`).
    pub fn push_block(&self, block: Block, txs: Vec<Transaction>) {
        let mut inner = self.inner.lock();
        for tx in txs {
            inner.tx_heights.insert(tx.id, block.height);
            inner.transactions.insert(tx.hash, tx);
        }
        inner.blocks.insert(block.height, block);
    }

    /// Drop a transaction so `transactions_for` reports it missing.
    /// Simulates a transaction that has not finished propagating.
    pub fn withhold_transaction(&self, hash: &TxHash) -> Option<Transaction> {
        self.inner.lock().transactions.remove(hash)
    }

    /// Re-add a previously withheld transaction.
    pub fn release_transaction(&self, tx: Transaction) {
        let mut inner = self.inner.lock();
        inner.transactions.insert(tx.hash, tx);
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn chain_height(&self) -> Result<u64, LedgerFetchError> {
        let inner = self.inner.lock();
        Ok(inner.blocks.keys().next_back().map_or(0, |top| top + 1))
    }

    async fn block_at_height(&self, height: u64) -> Result<Block, LedgerFetchError> {
        let inner = self.inner.lock();
        inner
            .blocks
            .get(&height)
            .cloned()
            .ok_or(LedgerFetchError::BlockNotAvailable(height))
    }

    async fn transactions_for(
        &self,
        block: &Block,
    ) -> Result<(Vec<Transaction>, Vec<TxHash>), LedgerFetchError> {
        let inner = self.inner.lock();
        let mut found = Vec::with_capacity(block.tx_count());
        let mut missing = Vec::new();
        for hash in block.all_tx_hashes() {
            match inner.transactions.get(hash) {
                Some(tx) => found.push(tx.clone()),
                None => missing.push(*hash),
            }
        }
        Ok((found, missing))
    }

    async fn transaction_id_of(&self, hash: &TxHash) -> Result<TxId, LedgerFetchError> {
        let inner = self.inner.lock();
        inner
            .transactions
            .get(hash)
            .map(|tx| tx.id)
            .ok_or(LedgerFetchError::UnknownTransaction)
    }

    async fn block_height_of(&self, id: TxId) -> Result<Option<u64>, LedgerFetchError> {
        let inner = self.inner.lock();
        Ok(inner.tx_heights.get(&id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockHash, PublicKey};

    fn tx(id: u64, hash_byte: u8) -> Transaction {
        Transaction {
            id: TxId(id),
            hash: TxHash([hash_byte; 32]),
            tx_pub_key: PublicKey([hash_byte; 32]),
            key_images: vec![],
            outputs: vec![],
            payment_id: None,
            encrypted_payment_id: None,
        }
    }

    fn block(height: u64, tx_hashes: &[u8]) -> Block {
        Block {
            height,
            hash: BlockHash([height as u8; 32]),
            timestamp: 1_400_000_000 + height * 120,
            miner_tx_hash: TxHash([0xc0 + height as u8; 32]),
            tx_hashes: tx_hashes.iter().map(|b| TxHash([*b; 32])).collect(),
        }
    }

    #[tokio::test]
    async fn empty_ledger_has_height_zero() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.chain_height().await.unwrap(), 0);
        assert!(ledger.block_at_height(0).await.is_err());
    }

    #[tokio::test]
    async fn push_and_fetch() {
        let ledger = MemoryLedger::new();
        let blk = block(0, &[0x11]);
        let coinbase = tx(0, 0xc0);
        let user_tx = tx(1, 0x11);
        ledger.push_block(blk.clone(), vec![coinbase, user_tx]);

        assert_eq!(ledger.chain_height().await.unwrap(), 1);
        let fetched = ledger.block_at_height(0).await.unwrap();
        let (found, missing) = ledger.transactions_for(&fetched).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(missing.is_empty());

        assert_eq!(
            ledger.transaction_id_of(&TxHash([0x11; 32])).await.unwrap(),
            TxId(1)
        );
        assert_eq!(ledger.block_height_of(TxId(1)).await.unwrap(), Some(0));
        assert_eq!(ledger.block_height_of(TxId(99)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn withheld_transactions_are_reported_missing() {
        let ledger = MemoryLedger::new();
        let blk = block(0, &[0x11]);
        ledger.push_block(blk.clone(), vec![tx(0, 0xc0), tx(1, 0x11)]);

        let held = ledger.withhold_transaction(&TxHash([0x11; 32])).unwrap();
        let (found, missing) = ledger.transactions_for(&blk).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(missing, vec![TxHash([0x11; 32])]);

        ledger.release_transaction(held);
        let (found, missing) = ledger.transactions_for(&blk).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(missing.is_empty());
    }
}
