//! Console logging for the filter tool.
//!
//! Every progress line of a run is a `tracing` event. [`init_logging`]
//! installs the one global subscriber that writes them to stderr, either as
//! compact text or as JSON lines.
//!
//! ```ignore
//! use ghfilters_core::tracing::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::default())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose events are shown by default: the library crates and the
/// binary.
const TARGETS: [&str; 2] = ["ghfilters", "create_github_gmail_filters"];

/// Errors from [`init_logging`].
#[derive(Debug, Error)]
pub enum LogError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
}

/// Line format of log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// How to log a run.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level of the workspace crates when `RUST_LOG` is unset.
    pub level: Level,
    pub format: LogFormat,
    /// Show source file, line and target on every line.
    pub verbose: bool,
    /// Explicit filter directive; takes precedence over `RUST_LOG`.
    pub directive: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            verbose: false,
            directive: None,
        }
    }
}

impl LogConfig {
    /// Settings for `--debug`.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            verbose: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }

    /// Filter applied when neither `directive` nor `RUST_LOG` is set, e.g.
    /// `ghfilters=INFO,create_github_gmail_filters=INFO`.
    pub fn default_directive(&self) -> String {
        TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> Result<EnvFilter, LogError> {
        match &self.directive {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }
}

/// Installs the global subscriber. Call once, at startup.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    let registry = tracing_subscriber::registry().with(config.filter()?);

    match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(config.verbose)
                    .with_file(config.verbose)
                    .with_line_number(config.verbose),
            ),
        )?,
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_file(config.verbose)
                    .with_line_number(config.verbose),
            ),
        )?,
    }

    Ok(())
}
