//! Tracing subscriber setup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::SpecsmithError;

/// Environment variable whose filter directives override the configured level.
pub const LOG_ENV: &str = "SPECSMITH_LOG";

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Colored output (text format only).
    #[serde(default = "default_true")]
    pub ansi: bool,

    /// Per-module levels, e.g. `specsmith::generation = "debug"`.
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::Text,
            ansi: true,
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Sets the level.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets the format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a per-module level.
    #[must_use]
    pub fn with_module(mut self, module: impl Into<String>, level: impl Into<String>) -> Self {
        self.modules.insert(module.into(), level.into());
        self
    }

    /// Filter directives derived from this config.
    #[must_use]
    pub fn directives(&self) -> String {
        std::iter::once(self.level.clone())
            .chain(self.modules.iter().map(|(m, l)| format!("{m}={l}")))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Installs the global tracing subscriber.
///
/// `SPECSMITH_LOG` takes precedence over the configured directives. Returns
/// `Ok(false)` if a global subscriber was already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool, SpecsmithError> {
    let directives = std::env::var(LOG_ENV).unwrap_or_else(|_| config.directives());
    let filter = EnvFilter::try_new(&directives)
        .map_err(|e| SpecsmithError::Logging(format!("invalid filter '{directives}': {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_ansi(config.ansi).with_target(true))
            .try_init(),
    };

    Ok(installed.is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        let config = LoggingConfig::default()
            .with_level("warn")
            .with_module("specsmith::generation", "debug");
        assert_eq!(config.directives(), "warn,specsmith::generation=debug");
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.ansi);
    }

    #[test]
    fn test_init_is_repeatable() {
        let config = LoggingConfig::default().with_level("off");
        assert!(init_tracing(&config).is_ok());
        assert!(!init_tracing(&config).unwrap());
    }

    #[test]
    fn test_bad_level_is_rejected() {
        if std::env::var(LOG_ENV).is_ok() {
            return;
        }
        let config = LoggingConfig::default().with_level("specsmith=verbose");
        assert!(matches!(init_tracing(&config), Err(SpecsmithError::Logging(_))));
    }
}
