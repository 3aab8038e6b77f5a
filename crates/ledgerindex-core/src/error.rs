//! Error taxonomy for the indexing pipeline.
//!
//! Three classes with distinct handling:
//! - [`StorageError`] — environment-level failure. Fatal: the loop reports
//!   it and stops; nothing retries it.
//! - [`LedgerFetchError`] — requested data not available yet. Transient:
//!   the current catch-up pass is abandoned and retried after the wait
//!   interval.
//! - [`IndexError`] — a write failed mid-block. The block's transaction is
//!   rolled back (no partial entries survive) and the pass is retried.
//!
//! "Not found" on a query is *not* an error anywhere in this codebase; it
//! is `Ok(None)` or an empty sequence.

use thiserror::Error;

/// Environment-level storage failure. Fatal; never retried.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot open index store at {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("sub-database '{0}' missing from the environment")]
    MissingDatabase(&'static str),

    #[error("storage backend: {0}")]
    Backend(String),

    #[error("corrupt entry in '{db}': {reason}")]
    Corrupt { db: &'static str, reason: String },

    #[error("checkpoint i/o: {0}")]
    Checkpoint(String),
}

/// Requested ledger data is not (yet) available. Transient; the pass backs
/// off and retries.
#[derive(Debug, Error)]
pub enum LedgerFetchError {
    #[error("block {0} not available yet")]
    BlockNotAvailable(u64),

    #[error("{missing} transaction(s) of block {height} not available yet")]
    TransactionsNotAvailable { height: u64, missing: usize },

    #[error("transaction hash unknown to the ledger")]
    UnknownTransaction,

    #[error("ledger backend: {0}")]
    Backend(String),
}

/// A write failed while indexing a block. The enclosing write transaction
/// is rolled back; the pass retries after backoff.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index write failed: {0}")]
    Write(#[from] StorageError),

    #[error("cannot encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },
}

/// Terminal failure of the indexing loop. Only environment-level storage
/// failures end up here; everything else is retried in place.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("fatal storage failure: {0}")]
    Storage(#[from] StorageError),
}

/// Failure of a query. Absent keys are not represented here; they come
/// back as `Ok(None)` or an empty sequence.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("ledger lookup failed: {0}")]
    Ledger(#[from] LedgerFetchError),
}
