//! ledgerindex-engine — the indexing pipeline over `ledgerindex-store`.
//!
//! # Phases
//!
//! **Catch-up**: fetch every block between the checkpoint and
//! `chain_height − confirmation_lag`, hand each batch to the
//! [`BlockIndexer`] (one atomic write transaction per batch), persist the
//! checkpoint, repeat.
//!
//! **Idle wait**: caught up; sleep for the poll interval, then re-check
//! the chain height.
//!
//! The [`QueryEngine`] serves point and range lookups concurrently with
//! indexing, each call through its own snapshot transaction.

pub mod builder;
pub mod index_loop;
pub mod indexer;
pub mod query;

pub use builder::EngineBuilder;
pub use index_loop::{IndexLoop, PassError};
pub use indexer::BlockIndexer;
pub use query::QueryEngine;
