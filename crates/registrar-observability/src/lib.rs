//! Registrar Observability
//!
//! Console logging for the Registrar binaries and tests.
//!
//! ```ignore
//! use registrar_config::LoggingConfig;
//! use registrar_observability::init_logging;
//!
//! init_logging(&LoggingConfig::from_env());
//! tracing::info!("ready");
//! ```

use registrar_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose logs follow `LOG_LEVEL`. Everything else is held at warn.
const REGISTRAR_TARGETS: [&str; 6] = [
    "registrar",
    "registrar_cli",
    "registrar_db",
    "registrar_core",
    "registrar_models",
    "registrar_config",
];

/// Builds the filter: `RUST_LOG` when set, otherwise `LOG_LEVEL` for the
/// Registrar crates with noisy dependencies held at warn.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(config)))
}

fn default_directives(config: &LoggingConfig) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        REGISTRAR_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, config.level)),
    );
    directives.push("sqlx=warn".to_string());
    directives.join(",")
}

/// Installs the global subscriber.
///
/// Returns `false` when a subscriber was already installed (tests calling
/// this more than once, for example).
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = build_filter(config);

    let layer = match config.format {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(filter)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).try_init().is_ok()
}
