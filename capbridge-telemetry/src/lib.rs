//! Tracing subscriber setup for capbridge binaries and tests.
//!
//! Library crates only emit `tracing` events; installing a subscriber is left
//! to the application, which calls [`TelemetryConfig::init`] once at startup.

#![warn(missing_docs, clippy::pedantic)]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Environment variable that overrides the configured filter.
pub const LOG_ENV: &str = "RUST_LOG";

/// Result alias for telemetry setup.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A filter directive did not parse.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// Offending directive.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, human friendly.
    Pretty,
    /// Single-line text.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// Subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Base filter, e.g. `info` or `capbridge_kernel=debug`.
    pub filter: String,
    /// Additional per-target directives appended to the base filter.
    pub directives: Vec<String>,
    /// Line format.
    pub format: LogFormat,
    /// Whether to emit ANSI colours in text formats.
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            directives: Vec::new(),
            format: LogFormat::default(),
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Sets the line format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the base filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Appends a per-target directive.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Builds the filter. `RUST_LOG`, when set and valid, takes precedence
    /// over the configured filter.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] when the configured filter or
    /// a directive does not parse.
    pub fn env_filter(&self) -> TelemetryResult<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
            return Ok(filter);
        }

        let mut filter = EnvFilter::try_new(&self.filter).map_err(|err| {
            TelemetryError::InvalidFilter {
                directive: self.filter.clone(),
                reason: err.to_string(),
            }
        })?;
        for directive in &self.directives {
            let parsed = directive.parse::<Directive>().map_err(|err| {
                TelemetryError::InvalidFilter {
                    directive: directive.clone(),
                    reason: err.to_string(),
                }
            })?;
            filter = filter.add_directive(parsed);
        }
        Ok(filter)
    }

    /// Installs the global subscriber, writing to stderr.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidFilter`] for a malformed filter and
    /// [`TelemetryError::AlreadyInstalled`] if a global subscriber exists.
    pub fn init(&self) -> TelemetryResult<()> {
        let filter = self.env_filter()?;
        let registry = Registry::default().with(filter);

        let installed = match self.format {
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_ansi(self.ansi)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(true)
                        .with_ansi(self.ansi)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };

        installed.map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))?;
        debug!(format = ?self.format, "tracing subscriber installed");
        Ok(())
    }
}
