pub mod agents;
pub mod chat;
pub mod group;
pub mod lead;
pub mod onboard;

use fincrew_agent::{AgentFactory, AgentLibrary, WorkflowSettings};
use fincrew_config::AppConfig;
use fincrew_core::tool::ToolsetRegistry;
use fincrew_providers::{ProviderBackend, build_from_config};
use std::sync::Arc;
use tracing::debug;

/// Everything a workflow command needs.
pub struct Runtime {
    pub config: AppConfig,
    pub factory: AgentFactory,
    pub settings: WorkflowSettings,
}

/// The built-in library merged with the configured agents.
pub fn library(config: &AppConfig) -> AgentLibrary {
    let mut library = AgentLibrary::builtin();
    library.extend_from_config(config.agents.iter().cloned());
    library
}

pub fn runtime() -> Result<Runtime, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early without an API key
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export OPENROUTER_API_KEY='sk-or-v1-...'   (recommended)");
        eprintln!("    export OPENAI_API_KEY='sk-...'             (for OpenAI direct)");
        eprintln!("    export FINCREW_API_KEY='sk-...'            (generic)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = build_from_config(&config)?;
    let provider = router.active().ok_or("No active provider configured")?;
    let backend = ProviderBackend::new(provider, config.resolve_model()).with_max_tokens(config.default_max_tokens);

    // No data adapters ship with the CLI, so toolset references are skipped
    let factory = AgentFactory::new(Arc::new(library(&config)), ToolsetRegistry::lenient(), Arc::new(backend));
    let settings = WorkflowSettings::from_config(&config);
    debug!(provider = %router.active_name(), model = %config.resolve_model(), agents = factory.library().len(), "Runtime ready");

    Ok(Runtime {
        config,
        factory,
        settings,
    })
}
