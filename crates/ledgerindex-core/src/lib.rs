//! ledgerindex-core — foundation for the incremental ledger index engine.
//!
//! # Architecture
//!
//! ```text
//! IndexLoop (ledgerindex-engine)
//!     ├── Ledger           (read-only block/transaction source)
//!     ├── CheckpointStore  (durable resume position)
//!     ├── BlockIndexer     (per-block attribute extraction)
//!     └── IndexStore       (ledgerindex-store: RocksDB multi-maps)
//! QueryEngine reads the same IndexStore through snapshot transactions.
//! ```
//!
//! This crate holds what every layer shares: the entry and record types,
//! the error taxonomy, the `Ledger` collaborator trait, and checkpoint
//! persistence.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod ledger;
pub mod types;

pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::{EngineConfig, LoopState};
pub use error::{EngineError, IndexError, LedgerFetchError, QueryError, StorageError};
pub use ledger::{Ledger, MemoryLedger};
pub use types::{
    Block, BlockHash, EncryptedPaymentId, KeyImage, OutputInfo, PaymentId, PublicKey, Transaction,
    TxHash, TxId, TxOutput,
};
