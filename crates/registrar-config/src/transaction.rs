//! Retry policy for serializable transactions.
//!
//! Enrollment and "current" flag updates run at `SERIALIZABLE` isolation.
//! A transaction that loses a serialization race is rolled back and re-run
//! from scratch up to `max_retries` times.
//!
//! # Environment Variables
//!
//! - `DB_TX_MAX_RETRIES`: extra attempts after the first (default: 3)
//! - `DB_TX_RETRY_BACKOFF_MS`: base delay between attempts, doubled each time (default: 10)

use crate::parse_or;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 10,
        }
    }
}

impl TransactionConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            max_retries: parse_or(&lookup, "DB_TX_MAX_RETRIES", defaults.max_retries),
            retry_backoff_ms: parse_or(&lookup, "DB_TX_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
        }
    }

    /// No retries at all. Used by stores that never lose serialization races.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            retry_backoff_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(10);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}
