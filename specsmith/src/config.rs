//! Application configuration.
//!
//! Values come from serde (file or inline) or from the environment. The
//! environment loader reads a `.env` file first without overriding variables
//! that are already set.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::errors::SpecsmithError;
use crate::generation::RetryConfig;

pub use crate::observability::LoggingConfig;

/// Top-level configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generation service.
    #[serde(default)]
    pub api_key: String,

    /// Custom base URL for OpenAI-compatible services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Concurrent requests while planning test specs.
    #[serde(default = "default_concurrency")]
    pub planner_concurrency: usize,

    /// Concurrent requests while rendering tests.
    #[serde(default = "default_concurrency")]
    pub renderer_concurrency: usize,

    /// Concurrent requests while expanding BDD capabilities.
    #[serde(default = "default_concurrency")]
    pub bdd_concurrency: usize,

    /// Skip items whose artifact already exists.
    #[serde(default = "default_true")]
    pub skip_existing: bool,

    /// Root directory for every generated artifact.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Backoff policy for transient failures.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_model() -> String {
    "gpt-5-nano".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_concurrency() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_output_root() -> PathBuf {
    PathBuf::from(".unit_tester")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            planner_concurrency: default_concurrency(),
            renderer_concurrency: default_concurrency(),
            bdd_concurrency: default_concurrency(),
            skip_existing: true,
            output_root: default_output_root(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` if present, then reads configuration from the environment.
    pub fn from_env() -> Result<Self, SpecsmithError> {
        match dotenvy::dotenv() {
            Ok(_) => {}
            Err(e) if e.not_found() => {}
            Err(e) => return Err(SpecsmithError::Config(format!("failed to read .env: {e}"))),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SpecsmithError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("OPENAI_API_KEY") {
            config.api_key = key;
        }
        config.base_url = lookup("OPENAI_BASE_URL").filter(|url| !url.trim().is_empty());
        if let Some(model) = lookup("OPENAI_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(secs) = parse_var::<f64>(&lookup, "REQUEST_TIMEOUT_S")? {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(SpecsmithError::Config(format!(
                    "REQUEST_TIMEOUT_S must be positive, got {secs}"
                )));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let secs = secs.ceil() as u64;
            config.request_timeout_secs = secs;
        }
        if let Some(n) = parse_var(&lookup, "PLANNER_CONCURRENCY")? {
            config.planner_concurrency = n;
        }
        if let Some(n) = parse_var(&lookup, "RENDERER_CONCURRENCY")? {
            config.renderer_concurrency = n;
        }
        if let Some(n) = parse_var(&lookup, "BDD_CONCURRENCY")? {
            config.bdd_concurrency = n;
        }
        if let Some(value) = lookup("SKIP_EXISTING") {
            config.skip_existing = parse_bool("SKIP_EXISTING", &value)?;
        }

        Ok(config)
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the output root.
    #[must_use]
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Sets skip-existing.
    #[must_use]
    pub fn with_skip_existing(mut self, skip: bool) -> Self {
        self.skip_existing = skip;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Per-request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory for test-spec documents.
    #[must_use]
    pub fn specs_dir(&self) -> PathBuf {
        self.output_root.join("specs")
    }

    /// Directory for rendered tests.
    #[must_use]
    pub fn tests_dir(&self) -> PathBuf {
        self.output_root.join("tests")
    }

    /// Directory for BDD survey and feature documents.
    #[must_use]
    pub fn bdd_dir(&self) -> PathBuf {
        self.output_root.join("bdd")
    }

    /// Directory for Gherkin `.feature` files.
    #[must_use]
    pub fn features_dir(&self) -> PathBuf {
        self.bdd_dir().join("features")
    }

    /// The output root.
    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("planner_concurrency", &self.planner_concurrency)
            .field("renderer_concurrency", &self.renderer_concurrency)
            .field("bdd_concurrency", &self.bdd_concurrency)
            .field("skip_existing", &self.skip_existing)
            .field("output_root", &self.output_root)
            .field("retry", &self.retry)
            .field("logging", &self.logging)
            .finish()
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>, SpecsmithError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| SpecsmithError::Config(format!("{name}='{raw}': {e}")))
        })
        .transpose()
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, SpecsmithError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SpecsmithError::Config(format!(
            "{name}='{raw}': expected a boolean"
        ))),
    }
}
