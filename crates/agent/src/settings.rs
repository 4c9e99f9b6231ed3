//! Static workflow options, resolved once from configuration.

use fincrew_config::AppConfig;
use fincrew_core::backend::SendOptions;

/// Instructions given to the planning agent of a shadow workflow.
pub const DEFAULT_SHADOW_INSTRUCTIONS: &str = "You are a planning agent. Your role is to:\n\
1. Analyze the user's request\n\
2. Break it down into clear, actionable steps\n\
3. Determine what resources and tools are needed\n\
4. Create a detailed execution plan\n\n\
Provide a step-by-step plan that the execution agent can follow.";

/// Round/turn limits and prompts shared by every pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSettings {
    /// Options forwarded with every exchange.
    pub send: SendOptions,
    pub max_rounds: u32,
    pub termination_token: String,
    pub selection_instructions: String,
    pub shadow_instructions: String,
    pub rag_top_k: usize,
    pub rag_chunk_size: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let workflow = &config.workflow;
        Self {
            send: SendOptions::new()
                .with_temperature(config.default_temperature)
                .with_max_turns(workflow.max_turns),
            max_rounds: workflow.max_rounds,
            termination_token: workflow.termination_token.clone(),
            selection_instructions: workflow.selection_instructions.clone(),
            shadow_instructions: workflow
                .shadow_instructions
                .clone()
                .unwrap_or_else(|| DEFAULT_SHADOW_INSTRUCTIONS.to_string()),
            rag_top_k: workflow.rag_top_k,
            rag_chunk_size: workflow.rag_chunk_size,
        }
    }

    /// Zero is kept as given; building a group with it fails.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.send = self.send.with_max_turns(max_turns);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.send = self.send.with_temperature(temperature);
        self
    }

    pub fn with_termination_token(mut self, token: impl Into<String>) -> Self {
        self.termination_token = token.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config() {
        let settings = WorkflowSettings::default();
        assert_eq!(settings.max_rounds, 10);
        assert_eq!(settings.send.max_turns, 10);
        assert_eq!(settings.termination_token, "TERMINATE");
        assert!(settings.shadow_instructions.starts_with("You are a planning agent."));
    }

    #[test]
    fn config_overrides_are_applied() {
        let mut config = AppConfig::default();
        config.default_temperature = 0.2;
        config.workflow.max_turns = 4;
        config.workflow.shadow_instructions = Some("Plan tersely.".into());

        let settings = WorkflowSettings::from_config(&config).with_max_rounds(3);
        assert_eq!(settings.send.temperature, 0.2);
        assert_eq!(settings.send.max_turns, 4);
        assert_eq!(settings.shadow_instructions, "Plan tersely.");
        assert_eq!(settings.max_rounds, 3);
    }
}
