//! The resumable indexing loop.
//!
//! ```text
//! ┌────────────┐  caught up   ┌───────────┐  poll interval
//! │ CatchingUp │ ───────────► │ IdleWait  │ ──────┐
//! └────────────┘              └───────────┘       │
//!       ▲  │ storage failure        ▲             │
//!       │  ▼                        └─────────────┘
//!       │ ┌────────┐
//!       └─│ Failed │  (terminal)
//!         └────────┘
//! ```
//!
//! Each catch-up pass reloads the checkpoint, computes the confirmed
//! target (`chain_height − confirmation_lag`), and indexes forward in
//! batches. Transient failures abandon the pass and retry after the poll
//! interval; storage failures are terminal.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use ledgerindex_core::checkpoint::CheckpointStore;
use ledgerindex_core::config::{EngineConfig, LoopState};
use ledgerindex_core::error::{EngineError, IndexError, LedgerFetchError, StorageError};
use ledgerindex_core::ledger::Ledger;
use ledgerindex_core::types::{Block, Transaction};

use crate::indexer::BlockIndexer;

/// Outcome of one failed catch-up pass. Only the `Storage` variant is
/// terminal; the others make the loop back off and retry.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("ledger fetch: {0}")]
    Fetch(#[from] LedgerFetchError),

    #[error("block indexing: {0}")]
    Index(#[from] IndexError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

/// Drives the indexer from the checkpoint toward the confirmed chain tip,
/// forever.
pub struct IndexLoop {
    config: EngineConfig,
    ledger: Arc<dyn Ledger>,
    indexer: BlockIndexer,
    checkpoint: Arc<dyn CheckpointStore>,
    state: LoopState,
}

impl IndexLoop {
    pub fn new(
        config: EngineConfig,
        ledger: Arc<dyn Ledger>,
        indexer: BlockIndexer,
        checkpoint: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            config,
            ledger,
            indexer,
            checkpoint,
            state: LoopState::CatchingUp,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until a terminal storage failure. Never returns `Ok`.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        loop {
            self.state = LoopState::CatchingUp;
            match self.catch_up_pass().await {
                Ok(()) => {
                    self.state = LoopState::IdleWait;
                }
                Err(PassError::Storage(e)) => {
                    self.state = LoopState::Failed;
                    error!(error = %e, "indexing loop stopped");
                    return Err(e.into());
                }
                Err(e) => {
                    // Transient: keep the checkpoint where it is and try
                    // the same heights again after the wait.
                    warn!(error = %e, "catch-up pass abandoned, will retry");
                }
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    /// One catch-up pass: index every confirmed height above the
    /// checkpoint, committing and checkpointing batch by batch.
    ///
    /// An error mid-pass leaves every fully committed batch checkpointed;
    /// the next pass resumes from there.
    pub async fn catch_up_pass(&mut self) -> Result<(), PassError> {
        let height = self.ledger.chain_height().await?;
        let target = height.saturating_sub(self.config.confirmation_lag);

        let mut next = match self.checkpoint.load().await? {
            Some(indexed) => indexed + 1,
            None => 0,
        };

        while next < target {
            let batch_end = (next + self.config.batch_size.max(1)).min(target);
            let batch = self.fetch_batch(next, batch_end).await?;

            self.indexer.index_blocks(&batch)?;
            self.checkpoint.save(batch_end - 1).await?;
            info!(
                from = next,
                to = batch_end - 1,
                target,
                "indexed and checkpointed"
            );
            next = batch_end;
        }
        Ok(())
    }

    async fn fetch_batch(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<(Block, Vec<Transaction>)>, PassError> {
        let mut batch = Vec::with_capacity((to - from) as usize);
        for h in from..to {
            let block = self.ledger.block_at_height(h).await?;
            let (txs, missing) = self.ledger.transactions_for(&block).await?;
            if !missing.is_empty() {
                return Err(LedgerFetchError::TransactionsNotAvailable {
                    height: h,
                    missing: missing.len(),
                }
                .into());
            }
            batch.push((block, txs));
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledgerindex_core::checkpoint::MemoryCheckpointStore;
    use ledgerindex_core::ledger::MemoryLedger;
    use ledgerindex_core::types::{
        BlockHash, PublicKey, TxHash, TxId, TxOutput,
    };
    use ledgerindex_store::{IndexDb, IndexStore, StoreConfig};

    fn coinbase(height: u64) -> Transaction {
        Transaction {
            id: TxId(height * 10),
            hash: TxHash([0xc0 ^ height as u8; 32]),
            tx_pub_key: PublicKey([0xd0 ^ height as u8; 32]),
            key_images: vec![],
            outputs: vec![TxOutput {
                public_key: PublicKey([height as u8; 32]),
                amount: 5_000,
            }],
            payment_id: None,
            encrypted_payment_id: None,
        }
    }

    fn block(height: u64) -> Block {
        Block {
            height,
            hash: BlockHash([height as u8; 32]),
            timestamp: 1_400_000_000 + height * 120,
            miner_tx_hash: TxHash([0xc0 ^ height as u8; 32]),
            tx_hashes: vec![],
        }
    }

    fn populated_ledger(heights: u64) -> Arc<MemoryLedger> {
        let ledger = Arc::new(MemoryLedger::new());
        for h in 0..heights {
            ledger.push_block(block(h), vec![coinbase(h)]);
        }
        ledger
    }

    struct Fixture {
        store: Arc<IndexStore>,
        checkpoint: Arc<MemoryCheckpointStore>,
        index_loop: IndexLoop,
        _dir: tempfile::TempDir,
    }

    fn fixture(ledger: Arc<MemoryLedger>, config: EngineConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(IndexStore::open(StoreConfig::for_testing(dir.path())).unwrap());
        let checkpoint = Arc::new(MemoryCheckpointStore::new());
        let index_loop = IndexLoop::new(
            config,
            ledger,
            BlockIndexer::new(store.clone()),
            checkpoint.clone(),
        );
        Fixture {
            store,
            checkpoint,
            index_loop,
            _dir: dir,
        }
    }

    fn height_indexed(store: &IndexStore, height: u64) -> bool {
        store
            .begin_read()
            .get_first(IndexDb::OutputKey, &[height as u8; 32])
            .unwrap()
            .is_some()
    }

    #[tokio::test]
    async fn catches_up_to_the_confirmed_target() {
        let config = EngineConfig {
            confirmation_lag: 10,
            ..EngineConfig::default()
        };
        let mut fx = fixture(populated_ledger(15), config);

        fx.index_loop.catch_up_pass().await.unwrap();

        // Height 15, lag 10: heights 0..=4 are confirmed, 5..=14 withheld.
        assert_eq!(fx.checkpoint.load().await.unwrap(), Some(4));
        assert!(height_indexed(&fx.store, 4));
        assert!(!height_indexed(&fx.store, 5));
    }

    #[tokio::test]
    async fn short_chain_is_a_no_op() {
        let config = EngineConfig {
            confirmation_lag: 10,
            ..EngineConfig::default()
        };
        let mut fx = fixture(populated_ledger(7), config);

        fx.index_loop.catch_up_pass().await.unwrap();

        assert_eq!(fx.checkpoint.load().await.unwrap(), None);
        assert!(!height_indexed(&fx.store, 0));
    }

    #[tokio::test]
    async fn resumes_above_the_checkpoint() {
        let config = EngineConfig {
            confirmation_lag: 0,
            ..EngineConfig::default()
        };
        let mut fx = fixture(populated_ledger(5), config);

        fx.checkpoint.save(2).await.unwrap();
        fx.index_loop.catch_up_pass().await.unwrap();

        assert_eq!(fx.checkpoint.load().await.unwrap(), Some(4));
        // Heights at or below the pre-set checkpoint were never touched.
        assert!(!height_indexed(&fx.store, 2));
        assert!(height_indexed(&fx.store, 3));
        assert!(height_indexed(&fx.store, 4));
    }

    #[tokio::test]
    async fn missing_transactions_abandon_the_pass() {
        let config = EngineConfig {
            confirmation_lag: 0,
            ..EngineConfig::default()
        };
        let ledger = Arc::new(MemoryLedger::new());
        for h in 0..3 {
            let mut blk = block(h);
            if h == 1 {
                blk.tx_hashes = vec![TxHash([0xaa; 32])];
            }
            ledger.push_block(blk, vec![coinbase(h)]);
        }
        let mut fx = fixture(ledger.clone(), config);

        let err = fx.index_loop.catch_up_pass().await.unwrap_err();
        assert!(matches!(
            err,
            PassError::Fetch(LedgerFetchError::TransactionsNotAvailable { height: 1, .. })
        ));
        // Block 0 committed and checkpointed before the failure.
        assert_eq!(fx.checkpoint.load().await.unwrap(), Some(0));
        assert!(height_indexed(&fx.store, 0));
        assert!(!height_indexed(&fx.store, 1));

        // Once the transaction shows up, the retried pass finishes the job.
        let mut late = coinbase(99);
        late.hash = TxHash([0xaa; 32]);
        ledger.release_transaction(late);
        fx.index_loop.catch_up_pass().await.unwrap();
        assert_eq!(fx.checkpoint.load().await.unwrap(), Some(2));
        assert!(height_indexed(&fx.store, 1));
        assert!(height_indexed(&fx.store, 2));
    }

    #[tokio::test]
    async fn batches_clamp_to_the_target() {
        let config = EngineConfig {
            confirmation_lag: 0,
            batch_size: 4,
            ..EngineConfig::default()
        };
        let mut fx = fixture(populated_ledger(6), config);

        fx.index_loop.catch_up_pass().await.unwrap();

        // Two batches: 0..=3 then the clamped 4..=5.
        assert_eq!(fx.checkpoint.load().await.unwrap(), Some(5));
        for h in 0..6 {
            assert!(height_indexed(&fx.store, h));
        }
    }

    struct BrokenCheckpointStore;

    #[async_trait]
    impl CheckpointStore for BrokenCheckpointStore {
        async fn load(&self) -> Result<Option<u64>, StorageError> {
            Err(StorageError::Checkpoint("checkpoint device gone".into()))
        }

        async fn save(&self, _height: u64) -> Result<(), StorageError> {
            Err(StorageError::Checkpoint("checkpoint device gone".into()))
        }
    }

    #[tokio::test]
    async fn storage_failure_ends_the_loop_in_failed_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(IndexStore::open(StoreConfig::for_testing(dir.path())).unwrap());
        let mut index_loop = IndexLoop::new(
            EngineConfig {
                confirmation_lag: 0,
                ..EngineConfig::default()
            },
            populated_ledger(3),
            BlockIndexer::new(store),
            Arc::new(BrokenCheckpointStore),
        );

        let err = index_loop.run().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Storage(StorageError::Checkpoint(_))
        ));
        assert_eq!(index_loop.state(), LoopState::Failed);
    }

    #[tokio::test]
    async fn stale_checkpoint_reindexes_without_error() {
        let config = EngineConfig {
            confirmation_lag: 0,
            ..EngineConfig::default()
        };
        let mut fx = fixture(populated_ledger(3), config);

        fx.index_loop.catch_up_pass().await.unwrap();
        assert_eq!(fx.checkpoint.load().await.unwrap(), Some(2));

        // A checkpoint older than the store (e.g. restored from backup)
        // makes the loop re-index; duplicate entries are tolerated and
        // collapsed at query time.
        fx.checkpoint.save(0).await.unwrap();
        fx.index_loop.catch_up_pass().await.unwrap();
        assert_eq!(fx.checkpoint.load().await.unwrap(), Some(2));
        assert!(height_indexed(&fx.store, 1));
    }
}
