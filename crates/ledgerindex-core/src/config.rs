//! Engine configuration and loop state.
//!
//! No global mutable state anywhere: every component receives an explicit
//! configuration value at construction.

use serde::{Deserialize, Serialize};

/// Configuration for the indexing engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of most-recent blocks withheld from indexing, so data still
    /// subject to reorganization is never indexed. With chain height `N`
    /// the loop indexes heights strictly below `N − confirmation_lag`.
    pub confirmation_lag: u64,
    /// Blocks committed per write transaction. Larger batches trade a
    /// wider crash-recovery window (the whole uncommitted batch is
    /// re-indexed) for throughput.
    pub batch_size: u64,
    /// Wait interval between catch-up passes, and the backoff after a
    /// transient failure (milliseconds).
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation_lag: 10,
            batch_size: 1,
            poll_interval_ms: 10_000,
        }
    }
}

/// Runtime state of the indexing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    /// Indexing heights between the checkpoint and the confirmed target.
    CatchingUp,
    /// Caught up; sleeping until the next height check.
    IdleWait,
    /// Hit an environment-level storage failure. Terminal.
    Failed,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatchingUp => write!(f, "catching-up"),
            Self::IdleWait => write!(f, "idle-wait"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert!(cfg.batch_size >= 1);
        assert!(cfg.poll_interval_ms > 0);
    }

    #[test]
    fn loop_state_display() {
        assert_eq!(LoopState::CatchingUp.to_string(), "catching-up");
        assert_eq!(LoopState::Failed.to_string(), "failed");
    }
}
