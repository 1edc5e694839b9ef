//! Logging bootstrap shared by the iconbridge binaries
//!
//! Logs always go to stderr: the bridge daemon owns stdout for protocol
//! traffic. `RUST_LOG` takes precedence over the configured level.

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration structure
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: Level,
    /// Whether to include thread ids
    pub include_thread_info: bool,
    /// Whether to include the module target
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_thread_info: false,
            include_target: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Parse a level name (`trace` … `error`), case-insensitively
pub fn parse_level(value: &str) -> Option<Level> {
    value.trim().parse().ok()
}

/// Install the global subscriber.
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one is left untouched.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_ascii_lowercase()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(config.include_target)
                .with_thread_ids(config.include_thread_info)
                .with_level(true),
        )
        .try_init()
        .is_ok()
}
