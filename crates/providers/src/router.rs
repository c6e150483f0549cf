//! Provider selection from configuration.

use crate::openai_compat::{GROQ_BASE_URL, OPENAI_BASE_URL, OpenAiCompatProvider};
use mkulima_config::AppConfig;
use mkulima_core::error::ProviderError;
use mkulima_core::provider::Provider;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Base URL for a named provider, preferring an explicit `api_url`.
pub fn resolve_base_url(provider: &str, api_url: Option<&str>) -> Option<String> {
    if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
        return Some(url.to_string());
    }
    match provider {
        "groq" => Some(GROQ_BASE_URL.into()),
        "openai" => Some(OPENAI_BASE_URL.into()),
        _ => None,
    }
}

/// Build the configured chat provider.
///
/// Fails with `NotConfigured` when no API key is set or when a custom
/// provider name has no `api_url`.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "no API key for provider '{}'",
                config.default_provider
            ))
        })?;

    let base_url = resolve_base_url(&config.default_provider, config.api_url.as_deref())
        .ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "provider '{}' needs an api_url",
                config.default_provider
            ))
        })?;

    // The HTTP client gets a little headroom over the workflow timeout so
    // the workflow's own deadline is what fires first.
    let timeout = Duration::from_secs(config.agent.model_timeout_secs + 5);

    info!(
        provider = %config.default_provider,
        model = %config.default_model,
        "Configured language model provider"
    );

    Ok(Arc::new(OpenAiCompatProvider::new(
        config.default_provider.clone(),
        base_url,
        api_key,
        timeout,
    )))
}
