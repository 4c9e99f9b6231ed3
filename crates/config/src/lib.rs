//! Configuration loading, validation, and management for fincrew.
//!
//! Loads configuration from `~/.fincrew/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use fincrew_core::AgentSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.fincrew/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider used for every agent exchange
    #[serde(default = "default_provider")]
    pub active_provider: String,

    /// Model alias (resolved through the provider's `models` table) or raw model id
    #[serde(default = "default_model")]
    pub active_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Workflow limits and prompts
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Extra agent personas merged over the built-in library
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentSpec>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "default".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("active_provider", &self.active_provider)
            .field("active_model", &self.active_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("workflow", &self.workflow)
            .field("providers", &self.providers)
            .field("agents", &self.agents.iter().map(|a| a.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("models", &self.models)
            .finish()
    }
}

/// Limits and prompts shared by the coordination patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Tool-call round-trips the backend may make per exchange
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Upper bound on group-chat rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Text that ends a group session when an agent says it
    #[serde(default = "default_termination_token")]
    pub termination_token: String,

    /// Prompt given to the group manager when it picks the next speaker
    #[serde(default = "default_selection_instructions")]
    pub selection_instructions: String,

    /// Overrides the planning agent's instructions in shadow mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_instructions: Option<String>,

    /// Passages retrieved per RAG query
    #[serde(default = "default_rag_top_k")]
    pub rag_top_k: usize,

    /// Characters per document chunk for the document retriever
    #[serde(default = "default_rag_chunk_size")]
    pub rag_chunk_size: usize,
}

fn default_max_turns() -> u32 {
    10
}
fn default_max_rounds() -> u32 {
    10
}
fn default_termination_token() -> String {
    "TERMINATE".into()
}
fn default_selection_instructions() -> String {
    "Select the most appropriate expert for the current task.".into()
}
fn default_rag_top_k() -> usize {
    5
}
fn default_rag_chunk_size() -> usize {
    2000
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            max_rounds: default_max_rounds(),
            termination_token: default_termination_token(),
            selection_instructions: default_selection_instructions(),
            shadow_instructions: None,
            rag_top_k: default_rag_top_k(),
            rag_chunk_size: default_rag_chunk_size(),
        }
    }
}

/// One OpenAI-compatible endpoint.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Literal key or `${ENV_VAR}` reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Alias → model id; the `default` alias is used when the active alias is unknown
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

impl ProviderConfig {
    /// The API key with any `${ENV_VAR}` reference substituted.
    pub fn resolved_api_key(&self, provider: &str) -> Result<Option<String>, ConfigError> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };
        match key.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
            Some(var) => match std::env::var(var) {
                Ok(value) if !value.is_empty() => Ok(Some(value)),
                _ => Err(ConfigError::MissingEnv {
                    var: var.to_string(),
                    provider: provider.to_string(),
                }),
            },
            None => Ok(Some(key.clone())),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.fincrew/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `FINCREW_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("FINCREW_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("FINCREW_PROVIDER") {
            self.active_provider = provider;
        }

        if let Ok(model) = std::env::var("FINCREW_MODEL") {
            self.active_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".fincrew")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.workflow.max_turns == 0 {
            return Err(ConfigError::ValidationError("workflow.max_turns must be at least 1".into()));
        }

        if self.workflow.max_rounds == 0 {
            return Err(ConfigError::ValidationError("workflow.max_rounds must be at least 1".into()));
        }

        if self.workflow.termination_token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "workflow.termination_token must not be empty".into(),
            ));
        }

        if self.workflow.rag_top_k == 0 || self.workflow.rag_chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.rag_top_k and workflow.rag_chunk_size must be positive".into(),
            ));
        }

        if let Some(agent) = self.agents.iter().find(|a| a.name.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "agent with description '{}' has an empty name",
                agent.description
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.active_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Settings for the active provider, if configured.
    pub fn active_provider_config(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.active_provider)
    }

    /// Map the active model alias to a concrete model id.
    ///
    /// Looks the alias up in the active provider's `models` table, falls
    /// back to its `default` alias, and finally to the alias itself.
    pub fn resolve_model(&self) -> String {
        let Some(provider) = self.active_provider_config() else {
            return self.active_model.clone();
        };
        provider
            .models
            .get(&self.active_model)
            .or_else(|| provider.models.get("default"))
            .cloned()
            .unwrap_or_else(|| self.active_model.clone())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let mut config = Self::default();
        config.providers.insert(
            "openrouter".into(),
            ProviderConfig {
                api_key: Some("${OPENROUTER_API_KEY}".into()),
                api_url: Some("https://openrouter.ai/api/v1".into()),
                models: BTreeMap::from([
                    ("default".into(), "openai/gpt-4o".into()),
                    ("gpt-4o".into(), "openai/gpt-4o".into()),
                    ("claude".into(), "anthropic/claude-sonnet-4".into()),
                ]),
            },
        );
        config.providers.insert(
            "aliyun".into(),
            ProviderConfig {
                api_key: Some("${DASHSCOPE_API_KEY}".into()),
                api_url: Some("https://dashscope.aliyuncs.com/compatible-mode/v1".into()),
                models: BTreeMap::from([
                    ("default".into(), "qwen-plus".into()),
                    ("qwen-max".into(), "qwen-max".into()),
                ]),
            },
        );
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            active_provider: default_provider(),
            active_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            workflow: WorkflowConfig::default(),
            providers: HashMap::new(),
            agents: Vec::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Environment variable {var} not set for provider {provider}")]
    MissingEnv { var: String, provider: String },
}
