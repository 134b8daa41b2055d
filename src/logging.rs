//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! host's choice. [`init_logging_with_config`] installs a `tracing-subscriber`
//! stack suited to services embedding the pipeline: an [`EnvFilter`] plus a
//! JSON (production) or pretty (development) formatter.
//!
//! Configuration comes from the environment:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `BRRTR_LOG_LEVEL` | `info` | trace / debug / info / warn / error |
//! | `BRRTR_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `BRRTR_LOG_TARGETS` | unset | extra comma-separated filter directives |
//! | `BRRTR_LOG_LOCATION` | `false` | include file and line |
//!
//! `RUST_LOG`, when set, takes precedence over `BRRTR_LOG_LEVEL`. Directives
//! in `BRRTR_LOG_TARGETS` are applied on top of either, and a malformed one
//! fails initialization instead of being dropped.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const LEVEL_VAR: &str = "BRRTR_LOG_LEVEL";
const FORMAT_VAR: &str = "BRRTR_LOG_FORMAT";
const TARGETS_VAR: &str = "BRRTR_LOG_TARGETS";
const LOCATION_VAR: &str = "BRRTR_LOG_LOCATION";

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Extra filter directives, comma-separated (`brrtendpoint::docs=warn,...`)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::default_prod()
    }
}

impl LogConfig {
    /// Read the `BRRTR_LOG_*` variables, falling back to production defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; unset variables keep the production
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default_prod();
        Self {
            log_level: lookup(LEVEL_VAR).unwrap_or(defaults.log_level),
            format: lookup(FORMAT_VAR).map_or(defaults.format, |f| LogFormat::parse(&f)),
            target_filter: lookup(TARGETS_VAR).filter(|t| !t.trim().is_empty()),
            include_location: lookup(LOCATION_VAR)
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.include_location),
        }
    }

    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            include_location: true,
        }
    }

    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            target_filter: None,
            include_location: false,
        }
    }

    /// The configured level; unknown names mean `INFO`.
    #[must_use]
    pub fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// Parse `target_filter` into filter directives.
    fn directives(&self) -> Result<Vec<Directive>> {
        self.target_filter
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| {
                d.parse::<Directive>()
                    .with_context(|| format!("Invalid log filter directive '{d}' in {TARGETS_VAR}"))
            })
            .collect()
    }
}

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails on an invalid `target_filter` directive, or if a global subscriber
/// is already installed.
///
/// ```rust,no_run
/// use brrtendpoint::logging::{init_logging_with_config, LogConfig};
///
/// init_logging_with_config(&LogConfig::from_env()).expect("logging");
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));
    for directive in config.directives()? {
        env_filter = env_filter.add_directive(directive);
    }

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// [`init_logging_with_config`] with [`LogConfig::from_env`].
///
/// # Errors
///
/// See [`init_logging_with_config`].
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LogConfig::from_env())
}
