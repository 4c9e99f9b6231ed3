//! Provider router: selects the LLM provider named by the config.

use crate::openai_compat::OpenAiCompatProvider;
use fincrew_config::{AppConfig, ConfigError};
use fincrew_core::provider::Provider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Holds every configured provider and knows which one is active.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    active_provider: String,
}

impl ProviderRouter {
    pub fn new(active_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            active_provider: active_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// The provider every agent exchange goes through.
    pub fn active(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.active_provider).cloned()
    }

    pub fn active_name(&self) -> &str {
        &self.active_provider
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Build providers from configuration.
///
/// Per-provider keys may be `${ENV_VAR}` references; the top-level
/// `api_key` fills in for providers without one.
pub fn build_from_config(config: &AppConfig) -> Result<ProviderRouter, ConfigError> {
    let mut router = ProviderRouter::new(&config.active_provider);

    for (name, provider_config) in &config.providers {
        let api_key = match provider_config.resolved_api_key(name) {
            Ok(key) => key.or_else(|| config.api_key.clone()).unwrap_or_default(),
            // Only the active provider needs a usable key
            Err(e) if name == &config.active_provider && config.api_key.is_none() => return Err(e),
            Err(_) => config.api_key.clone().unwrap_or_default(),
        };

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        debug!(provider = %name, base_url = %base_url, "Registering provider");
        router.register(name.clone(), Arc::new(OpenAiCompatProvider::new(name, &base_url, &api_key)));
    }

    // Ensure the active provider exists (even if not explicitly configured)
    if router.active().is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.active_provider);
        router.register(
            config.active_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(&config.active_provider, &base_url, &api_key)),
        );
    }

    Ok(router)
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "aliyun" | "dashscope" => "https://dashscope.aliyuncs.com/compatible-mode/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
