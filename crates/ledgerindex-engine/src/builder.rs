//! Fluent builder API for assembling an indexing engine.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ledgerindex_core::{FileCheckpointStore, MemoryLedger};
//! use ledgerindex_engine::EngineBuilder;
//! use ledgerindex_store::{IndexStore, StoreConfig};
//!
//! let store = Arc::new(IndexStore::open(StoreConfig::new("/var/lib/ledgerindex")).unwrap());
//! let ledger = Arc::new(MemoryLedger::new());
//! let checkpoint = Arc::new(FileCheckpointStore::new("/var/lib/ledgerindex/checkpoint"));
//!
//! let (index_loop, queries) = EngineBuilder::new()
//!     .confirmation_lag(10)
//!     .batch_size(20)
//!     .poll_interval_ms(10_000)
//!     .build(store, ledger, checkpoint);
//! ```

use std::sync::Arc;

use ledgerindex_core::checkpoint::CheckpointStore;
use ledgerindex_core::config::EngineConfig;
use ledgerindex_core::ledger::Ledger;
use ledgerindex_store::IndexStore;

use crate::index_loop::IndexLoop;
use crate::indexer::BlockIndexer;
use crate::query::QueryEngine;

/// Fluent builder for `EngineConfig` and the assembled engine.
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Set how many most-recent blocks stay unindexed until confirmed.
    pub fn confirmation_lag(mut self, lag: u64) -> Self {
        self.config.confirmation_lag = lag;
        self
    }

    /// Set blocks committed per write transaction.
    pub fn batch_size(mut self, size: u64) -> Self {
        self.config.batch_size = size;
        self
    }

    /// Set the wait interval between catch-up passes in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Build just the `EngineConfig`.
    pub fn build_config(self) -> EngineConfig {
        self.config
    }

    /// Assemble the indexing loop and the query engine over one store.
    pub fn build(
        self,
        store: Arc<IndexStore>,
        ledger: Arc<dyn Ledger>,
        checkpoint: Arc<dyn CheckpointStore>,
    ) -> (IndexLoop, QueryEngine) {
        let indexer = BlockIndexer::new(store.clone());
        let index_loop = IndexLoop::new(self.config, ledger.clone(), indexer, checkpoint);
        let queries = QueryEngine::new(store, ledger);
        (index_loop, queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerindex_core::checkpoint::MemoryCheckpointStore;
    use ledgerindex_core::config::LoopState;
    use ledgerindex_core::ledger::MemoryLedger;
    use ledgerindex_store::StoreConfig;

    #[test]
    fn builder_defaults() {
        let cfg = EngineBuilder::new().build_config();
        assert_eq!(cfg.confirmation_lag, 10);
        assert_eq!(cfg.batch_size, 1);
        assert_eq!(cfg.poll_interval_ms, 10_000);
    }

    #[test]
    fn builder_custom() {
        let cfg = EngineBuilder::new()
            .confirmation_lag(3)
            .batch_size(50)
            .poll_interval_ms(500)
            .build_config();

        assert_eq!(cfg.confirmation_lag, 3);
        assert_eq!(cfg.batch_size, 50);
        assert_eq!(cfg.poll_interval_ms, 500);
    }

    #[test]
    fn build_assembles_a_runnable_engine() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(IndexStore::open(StoreConfig::for_testing(dir.path())).unwrap());
        let ledger = Arc::new(MemoryLedger::new());
        let checkpoint = Arc::new(MemoryCheckpointStore::new());

        let (index_loop, queries) = EngineBuilder::new()
            .confirmation_lag(0)
            .build(store, ledger, checkpoint);

        assert_eq!(index_loop.state(), LoopState::CatchingUp);
        assert!(queries.range_lookup(0, u64::MAX).unwrap().is_empty());
    }
}
