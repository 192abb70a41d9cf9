//! # Registrar Config
//!
//! Configuration types for the Registrar rules engine, loaded from
//! environment variables with defaults for anything unset or unparsable.
//!
//! - [`database`]: PostgreSQL connection settings
//! - [`transaction`]: retry policy for serializable transactions
//! - [`logging`]: log level and output format
//!
//! # Example
//!
//! ```ignore
//! use registrar_config::{DatabaseConfig, LoggingConfig, TransactionConfig};
//!
//! let database = DatabaseConfig::from_env();
//! let transactions = TransactionConfig::from_env();
//! let logging = LoggingConfig::from_env();
//! ```

pub mod database;
pub mod logging;
pub mod transaction;

// Re-export commonly used types at crate root
pub use database::DatabaseConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use transaction::TransactionConfig;

/// Reads `key` through `lookup` and parses it, falling back to `default`.
pub(crate) fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
