//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Library code only emits events; the binary installs the subscriber.
//!
//! # Log Levels
//!
//! - `error`: Failed batches
//! - `warn`: Missing optional sources, unknown lint options, discarded lint state
//! - `info`: Batch outcomes
//! - `debug`: State transitions, per-file work
//! - `trace`: Everything else
//!
//! `MINIPACK_LOG` (or `RUST_LOG`) overrides the level chosen on the command line.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "MINIPACK_LOG";

/// Configuration for logging behavior.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter
    pub level: Level,
    /// Include timestamps
    pub with_timestamps: bool,
    /// Include the module path
    pub with_target: bool,
    /// Use ANSI colors
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: Level::INFO, with_timestamps: false, with_target: false, with_ansi: true }
    }
}

impl LogConfig {
    /// Create a `LogConfig` from CLI flags.
    ///
    /// - `quiet`: warn level
    /// - 0 (no `-v`): info level
    /// - 1 (`-v`): debug level
    /// - 2+ (`-vv`): trace level
    #[must_use]
    pub fn from_verbosity(verbosity: u8, quiet: bool) -> Self {
        let level = match (quiet, verbosity) {
            (true, _) => Level::WARN,
            (false, 0) => Level::INFO,
            (false, 1) => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self { level, ..Default::default() }
    }

    /// Enable or disable timestamps.
    #[must_use]
    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.with_timestamps = enable;
        self
    }

    /// Enable or disable ANSI colors.
    #[must_use]
    pub fn with_ansi(mut self, enable: bool) -> Self {
        self.with_ansi = enable;
        self
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    init_logging_with_writer(config, std::io::stderr)
}

/// Install the global subscriber with a custom writer.
pub fn init_logging_with_writer<W>(config: &LogConfig, writer: W) -> Result<(), TryInitError>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = build_env_filter(config.level);
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(config.with_ansi)
        .with_target(config.with_target);

    if config.with_timestamps {
        tracing_subscriber::registry().with(filter).with(layer).try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(layer.without_time()).try_init()
    }
}

/// Build an `EnvFilter` for `level`, letting the environment override it.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            // Dependencies stay at warn.
            EnvFilter::new(format!("warn,minipack={}", level.as_str().to_lowercase()))
        })
}
