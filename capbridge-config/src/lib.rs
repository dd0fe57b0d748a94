//! Runtime configuration for capbridge.
//!
//! Configuration is a TOML document with three optional sections:
//!
//! ```toml
//! [model]
//! provider = "openai"
//! model = "gpt-4o"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [bridge]
//! dispatch = "concurrent"
//!
//! [telemetry]
//! filter = "info"
//! format = "json"
//! ```
//!
//! Secrets never live in the file: the model section names the environment
//! variable holding the API key.

#![warn(missing_docs, clippy::pedantic)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config `{}`: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid TOML for the schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The API key environment variable is unset or empty.
    #[error("environment variable `{var}` is not set")]
    MissingApiKey {
        /// Variable that was consulted.
        var: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Model providers the runtime can talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelProvider {
    /// `OpenAI` Responses API.
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
}

/// `[model]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSection {
    /// Provider backing the model.
    pub provider: ModelProvider,
    /// Model identifier.
    pub model: String,
    /// Optional override of the provider base URL.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Output token cap per request.
    pub max_output_tokens: Option<u32>,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            provider: ModelProvider::OpenAi,
            model: "gpt-4o".to_owned(),
            base_url: None,
            api_key_env: "OPENAI_API_KEY".to_owned(),
            timeout_secs: 60,
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl ModelSection {
    /// Reads the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when the variable is unset or
    /// blank.
    pub fn api_key(&self) -> ConfigResult<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingApiKey {
                var: self.api_key_env.clone(),
            }),
        }
    }
}

/// How call requests from one model turn are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One call after another.
    #[default]
    Sequential,
    /// All calls at once.
    Concurrent,
}

/// `[bridge]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeSection {
    /// Call dispatch mode.
    pub dispatch: DispatchMode,
    /// System prompt sent with every model request.
    pub system_prompt: Option<String>,
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line text.
    Pretty,
    /// Single-line text.
    #[default]
    Compact,
    /// Newline-delimited JSON.
    Json,
}

/// `[telemetry]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    /// Base log filter.
    pub filter: String,
    /// Extra per-target directives.
    pub directives: Vec<String>,
    /// Line format.
    pub format: LogFormat,
    /// ANSI colours in text formats.
    pub ansi: bool,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            directives: Vec::new(),
            format: LogFormat::default(),
            ansi: true,
        }
    }
}

/// Full runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Model settings.
    pub model: ModelSection,
    /// Bridge settings.
    pub bridge: BridgeSection,
    /// Logging settings.
    pub telemetry: TelemetrySection,
}

impl RuntimeConfig {
    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`RuntimeConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), model = %config.model.model, "configuration loaded");
        Ok(config)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        let model = &self.model;
        if model.model.trim().is_empty() {
            return Err(ConfigError::invalid("model.model", "must not be empty"));
        }
        if model.api_key_env.trim().is_empty() {
            return Err(ConfigError::invalid("model.api_key_env", "must not be empty"));
        }
        if model.timeout_secs == 0 {
            return Err(ConfigError::invalid("model.timeout_secs", "must be positive"));
        }
        if let Some(temperature) = model.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ConfigError::invalid(
                    "model.temperature",
                    format!("{temperature} is outside 0.0..=2.0"),
                ));
            }
        }
        if model.max_output_tokens == Some(0) {
            return Err(ConfigError::invalid("model.max_output_tokens", "must be positive"));
        }
        if let Some(url) = &model.base_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::invalid(
                    "model.base_url",
                    format!("`{url}` is not an http(s) URL"),
                ));
            }
        }
        if self.telemetry.filter.trim().is_empty() {
            return Err(ConfigError::invalid("telemetry.filter", "must not be empty"));
        }
        Ok(())
    }

    /// Serializes back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if serialization fails.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::invalid("config", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const FULL: &str = r#"
[model]
provider = "openai"
model = "gpt-4o-mini"
base_url = "https://proxy.internal/"
api_key_env = "CAPBRIDGE_TEST_KEY"
timeout_secs = 30
temperature = 0.2
max_output_tokens = 512

[bridge]
dispatch = "concurrent"
system_prompt = "Answer briefly."

[telemetry]
filter = "debug"
format = "json"
"#;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.bridge.dispatch, DispatchMode::Sequential);
        assert_eq!(config.telemetry.format, LogFormat::Compact);
    }

    #[test]
    fn parses_every_section() {
        let config = RuntimeConfig::from_toml_str(FULL).unwrap();
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.model.base_url.as_deref(), Some("https://proxy.internal/"));
        assert_eq!(config.model.timeout_secs, 30);
        assert_eq!(config.model.max_output_tokens, Some(512));
        assert_eq!(config.bridge.dispatch, DispatchMode::Concurrent);
        assert_eq!(config.bridge.system_prompt.as_deref(), Some("Answer briefly."));
        assert_eq!(config.telemetry.filter, "debug");
        assert_eq!(config.telemetry.format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_keys_and_providers() {
        let err = RuntimeConfig::from_toml_str("[model]\nmodle = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = RuntimeConfig::from_toml_str("[model]\nprovider = \"acme\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validation_names_the_field() {
        let err = RuntimeConfig::from_toml_str("[model]\ntemperature = 3.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "model.temperature", .. }));

        let err = RuntimeConfig::from_toml_str("[model]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "model.timeout_secs", .. }));

        let err = RuntimeConfig::from_toml_str("[model]\nbase_url = \"ftp://x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "model.base_url", .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(config.bridge.dispatch, DispatchMode::Concurrent);

        let err = RuntimeConfig::load(file.path().with_extension("missing")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn serialization_round_trips() {
        let config = RuntimeConfig::from_toml_str(FULL).unwrap();
        let text = config.to_toml_string().unwrap();
        assert_eq!(RuntimeConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn api_key_requires_variable() {
        let section = ModelSection {
            api_key_env: "CAPBRIDGE_CONFIG_TEST_UNSET_KEY".to_owned(),
            ..ModelSection::default()
        };
        let err = section.api_key().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey { var } if var == "CAPBRIDGE_CONFIG_TEST_UNSET_KEY"));
    }
}
