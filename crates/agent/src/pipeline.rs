//! Sequential multi-agent pipelines.
//!
//! A pipeline is an ordered list of stages. Each stage renders its prompt
//! template with the previous stage's output (the first stage gets the
//! caller's input), sends it to its agent on a fresh thread, and passes the
//! normalized reply on. Stages run strictly one after another and the first
//! failure aborts the run.

use crate::handle::AgentHandle;
use crate::normalize::normalize;
use fincrew_core::backend::SendOptions;
use fincrew_core::error::Error;
use serde::Serialize;
use tracing::info;

/// Placeholder replaced by the stage input.
pub const INPUT_PLACEHOLDER: &str = "{input}";

pub struct PipelineStage {
    agent: AgentHandle,
    template: String,
    temperature: Option<f32>,
}

impl PipelineStage {
    /// A stage whose prompt is `template` with `{input}` substituted. A
    /// template without the placeholder gets the input appended after a
    /// blank line.
    pub fn new(agent: AgentHandle, template: impl Into<String>) -> Self {
        Self {
            agent,
            template: template.into(),
            temperature: None,
        }
    }

    /// Override the temperature for this stage only.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn render(&self, input: &str) -> String {
        if self.template.contains(INPUT_PLACEHOLDER) {
            self.template.replace(INPUT_PLACEHOLDER, input)
        } else if self.template.is_empty() {
            input.to_string()
        } else {
            format!("{}\n\n{input}", self.template)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageOutput {
    pub agent: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub stages: Vec<StageOutput>,
}

impl PipelineOutput {
    /// The last stage's output.
    pub fn final_text(&self) -> &str {
        self.stages.last().map_or("", |s| s.text.as_str())
    }
}

pub struct Pipeline {
    stages: Vec<PipelineStage>,
    options: SendOptions,
}

impl Pipeline {
    pub fn new(options: SendOptions) -> Self {
        Self {
            stages: Vec::new(),
            options,
        }
    }

    pub fn stage(mut self, stage: PipelineStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn run(&self, input: &str) -> Result<PipelineOutput, Error> {
        let mut outputs = Vec::with_capacity(self.stages.len());
        let mut current = input.to_string();

        for (index, stage) in self.stages.iter().enumerate() {
            info!(stage = index + 1, agent = %stage.agent.name(), "Running pipeline stage");
            let options = match stage.temperature {
                Some(t) => self.options.with_temperature(t),
                None => self.options,
            };

            let mut thread = stage.agent.create_thread();
            let reply = stage.agent.send(&mut thread, &stage.render(&current), options).await?;
            current = normalize(reply);
            outputs.push(StageOutput {
                agent: stage.agent.name().to_string(),
                text: current.clone(),
            });
        }

        Ok(PipelineOutput { stages: outputs })
    }
}

/// Pull the first JSON object out of free-form model output.
///
/// Looks, in order, for a ```` ```json ```` fenced block, any fenced block,
/// then the outermost `{…}` span.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let candidate = if let Some(body) = fenced(text, "```json") {
        body
    } else if let Some(body) = fenced(text, "```") {
        body
    } else {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end < start {
            return None;
        }
        &text[start..=end]
    };
    serde_json::from_str(candidate.trim()).ok()
}

fn fenced<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(&rest[..end])
}
