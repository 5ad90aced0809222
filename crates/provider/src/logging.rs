//! Tracing setup for the provider process.
//!
//! Terraform captures provider stderr, so every layer writes there. The
//! filter honours `RUST_LOG` first, then Terraform's `TF_LOG` level.

use std::io;

pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

/// Environment variable Terraform uses for its log level.
pub const ENV_TF_LOG: &str = "TF_LOG";

/// Tracing output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty-printed human-readable format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
    /// Structured JSON format
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {s}")),
        }
    }
}

/// Tracing configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Level for the provider's own targets when no filter applies
    pub level: Level,
    /// Explicit `EnvFilter` directives, overriding `RUST_LOG`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Compact,
            level: Level::WARN,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Default configuration with the level taken from `TF_LOG` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let level = std::env::var(ENV_TF_LOG)
            .ok()
            .and_then(|value| parse_tf_log(&value))
            .unwrap_or(Level::WARN);
        Self {
            level,
            ..Self::default()
        }
    }
}

/// Maps a `TF_LOG` value onto a tracing level.
///
/// `TF_LOG=JSON` is Terraform's structured mode and maps to trace.
#[must_use]
pub fn parse_tf_log(value: &str) -> Option<Level> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" => Some(Level::WARN),
        "ERROR" => Some(Level::ERROR),
        _ => None,
    }
}

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("pagerduty_provider={level},pagerduty_workflow={level}")
}

/// Initialize tracing with the given configuration.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: LoggingConfig) -> Result<()> {
    let env_filter = if let Some(filter) = config.filter {
        EnvFilter::try_new(filter)
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_directives(config.level)))
    }
    .map_err(|e| Error::invalid_config(format!("Failed to create tracing filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
    };
    installed.map_err(|e| Error::invalid_config(format!("Failed to install tracing: {e}")))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        format = ?config.format,
        "Tracing initialized for PagerDuty provider"
    );

    Ok(())
}
