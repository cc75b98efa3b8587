//! Tracing subscriber setup
//!
//! Logs go to stdout, or to a daily rolling file when `logging.directory` is
//! set. `RUST_LOG` overrides the configured level.

use anyhow::{bail, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "locallibrary.log";

/// Keeps the background log writer alive; drop it last
pub struct Logger {
    _guard: WorkerGuard,
}

impl Logger {
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));

        let (writer, guard) = match config.directory.as_deref() {
            Some(directory) => {
                std::fs::create_dir_all(directory)
                    .with_context(|| format!("Failed to create log directory {}", directory))?;
                tracing_appender::non_blocking(tracing_appender::rolling::daily(
                    directory,
                    LOG_FILE_PREFIX,
                ))
            }
            None => tracing_appender::non_blocking(std::io::stdout()),
        };

        let fmt_layer = match config.format.as_str() {
            "json" => fmt::layer()
                .json()
                .with_writer(writer)
                .with_current_span(true)
                .with_target(true)
                .boxed(),
            "pretty" | "text" => fmt::layer()
                .with_writer(writer)
                .with_ansi(config.directory.is_none())
                .with_target(true)
                .boxed(),
            other => bail!("Invalid logging format: {}", other),
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to initialize tracing subscriber")?;

        tracing::info!(
            level = %config.level,
            format = %config.format,
            directory = config.directory.as_deref().unwrap_or("stdout"),
            "Logging initialized"
        );

        Ok(Logger { _guard: guard })
    }
}

/// Crate events at `level`, request traces at debug
fn default_directives(level: &str) -> String {
    format!("locallibrary_server={},tower_http=debug", level.to_lowercase())
}
