//! ledgerindex-store — the transactional multi-map storage layer.
//!
//! One RocksDB environment holds a fixed registry of named sub-databases
//! (column families), each either single-valued or duplicate-sorted.
//! Writers get atomic, single-writer batch transactions; readers get
//! snapshot-isolated cursors that never observe a partially committed
//! block.
//!
//! Duplicate-key semantics are encoded at the key level: duplicate-sorted
//! sub-databases append an 8-byte big-endian sequence number to every key,
//! so values under one key enumerate in insertion order and the store's
//! native byte sort doubles as the range-scan order.

pub mod registry;
pub mod store;
pub mod txn;

pub use registry::{DbKind, IndexDb};
pub use store::{IndexStore, StoreConfig};
pub use txn::{ReadTxn, Scan, ScanEntry, ScanMode, WriteTxn};
