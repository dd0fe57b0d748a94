//! Turns a [`RuntimeConfig`] into ready-to-use components.

use std::sync::Arc;
use std::time::Duration;

use capbridge_adapters::{AdapterError, OpenAiAdapter, OpenAiConfig};
use capbridge_config::{
    ConfigError, DispatchMode, LogFormat as ConfigLogFormat, ModelProvider, RuntimeConfig,
};
use capbridge_kernel::{BridgeOptions, DispatchStrategy};
use capbridge_telemetry::{LogFormat, TelemetryConfig, TelemetryError};
use thiserror::Error;

/// Result alias for setup helpers.
pub type SetupResult<T> = Result<T, SetupError>;

/// Errors raised while wiring components from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration was missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The model adapter could not be built.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// The tracing subscriber could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Builds bridge options from the `[bridge]` and `[model]` sections.
#[must_use]
pub fn bridge_options(config: &RuntimeConfig) -> BridgeOptions {
    let strategy = match config.bridge.dispatch {
        DispatchMode::Sequential => DispatchStrategy::Sequential,
        DispatchMode::Concurrent => DispatchStrategy::Concurrent,
    };
    let mut options = BridgeOptions::new().with_strategy(strategy);
    if let Some(prompt) = &config.bridge.system_prompt {
        options = options.with_system_prompt(prompt.clone());
    }
    if let Some(temperature) = config.model.temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(tokens) = config.model.max_output_tokens {
        options = options.with_max_output_tokens(tokens);
    }
    options
}

/// Builds the subscriber configuration from the `[telemetry]` section.
#[must_use]
pub fn telemetry_config(config: &RuntimeConfig) -> TelemetryConfig {
    let section = &config.telemetry;
    let format = match section.format {
        ConfigLogFormat::Pretty => LogFormat::Pretty,
        ConfigLogFormat::Compact => LogFormat::Compact,
        ConfigLogFormat::Json => LogFormat::Json,
    };
    TelemetryConfig {
        filter: section.filter.clone(),
        directives: section.directives.clone(),
        format,
        ansi: section.ansi,
    }
}

/// Installs the global subscriber described by the `[telemetry]` section.
///
/// # Errors
///
/// Returns [`SetupError::Telemetry`] if the filter is malformed or a
/// subscriber is already installed.
pub fn init_telemetry(config: &RuntimeConfig) -> SetupResult<()> {
    telemetry_config(config).init()?;
    Ok(())
}

/// Builds the `OpenAI` adapter configuration with an explicit API key.
///
/// # Errors
///
/// Returns [`SetupError::Adapter`] if the configured base URL is rejected.
pub fn openai_config(config: &RuntimeConfig, api_key: impl Into<String>) -> SetupResult<OpenAiConfig> {
    let model = &config.model;
    let mut openai = OpenAiConfig::new(model.model.clone())
        .with_api_key(api_key)
        .with_timeout(Duration::from_secs(model.timeout_secs));
    if let Some(url) = &model.base_url {
        openai = openai.with_base_url(url)?;
    }
    Ok(openai)
}

/// Builds the model adapter named by the `[model]` section, reading the API
/// key from the configured environment variable.
///
/// # Errors
///
/// Returns [`SetupError::Config`] if the key is missing and
/// [`SetupError::Adapter`] if the adapter rejects its configuration.
pub fn model_adapter(config: &RuntimeConfig) -> SetupResult<Arc<OpenAiAdapter>> {
    match config.model.provider {
        ModelProvider::OpenAi => {
            let key = config.model.api_key()?;
            let adapter = OpenAiAdapter::new(openai_config(config, key)?)?;
            Ok(Arc::new(adapter))
        }
    }
}
