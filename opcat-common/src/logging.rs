//! Logging setup for opcat binaries.
//!
//! Thin wrapper over `tracing-subscriber`: an `EnvFilter` seeded from the
//! config/CLI level, overridable through `OPCAT_LOG`, writing
//! human-readable lines to stderr.

use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable overriding the configured log level/filter.
pub const LOG_ENV_VAR: &str = "OPCAT_LOG";

/// Logging configuration, built from config defaults and CLI flags.
#[derive(Debug, Clone)]
pub struct LogConfig {
    level: String,
    stderr: bool,
}

impl LogConfig {
    /// Start from `default_level`, honoring `OPCAT_LOG` when set.
    pub fn from_env(default_level: &str) -> Self {
        let level = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| default_level.to_string());
        Self {
            level,
            stderr: false,
        }
    }

    /// Route output to stderr (keeps stdout clean for machine output such
    /// as `dump-sql`).
    #[must_use]
    pub fn with_stderr(mut self) -> Self {
        self.stderr = true;
        self
    }

    /// Override the level (e.g. `--verbose`).
    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    pub fn level(&self) -> &str {
        &self.level
    }
}

/// Install the global subscriber. Returns an error if one is already set.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let layer = if config.stderr {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .boxed()
    } else {
        fmt::layer().with_target(true).compact().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
    Ok(())
}
