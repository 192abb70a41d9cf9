//! Logging configuration.
//!
//! # Environment Variables
//!
//! - `LOG_LEVEL`: level for Registrar crates (default: "info")
//! - `LOG_FORMAT`: `compact` (default) or `json`
//!
//! `RUST_LOG`, when set, overrides the filter entirely.

use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl LoggingConfig {
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
            level: lookup("LOG_LEVEL")
                .filter(|level| !level.trim().is_empty())
                .unwrap_or(defaults.level),
            format: crate::parse_or(&lookup, "LOG_FORMAT", defaults.format),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" JSON ".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("compact".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_from_lookup() {
        let config = LoggingConfig::from_lookup(|k| match k {
            "LOG_LEVEL" => Some("debug".to_string()),
            "LOG_FORMAT" => Some("json".to_string()),
            _ => None,
        });
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(LoggingConfig::from_lookup(|_| None), LoggingConfig::default());
    }
}
