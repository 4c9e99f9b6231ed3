//! End-to-end tests for the fincrew orchestrator.
//!
//! These drive every workflow through the real `ProviderBackend` with a
//! scripted provider underneath, so tool resolution, thread bookkeeping and
//! prompt construction are all exercised together.

use std::sync::{Arc, Mutex};

use fincrew_agent::{
    AgentFactory, AgentLibrary, DocumentRetriever, MultiAssistant, StopReason, TranscriptEntry, WorkflowSettings,
    leader_workflow, multi_assistant, rag_assistant, shadow_assistant, single_assistant,
};
use fincrew_config::AppConfig;
use fincrew_core::agent::AgentSpec;
use fincrew_core::error::{ConfigurationError, Error, ProviderError, RetrievalError, ToolError};
use fincrew_core::message::{Message, MessageToolCall, Role};
use fincrew_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use fincrew_core::retriever::Retriever;
use fincrew_core::tool::{Tool, ToolResult, ToolsetRegistry};
use fincrew_providers::ProviderBackend;
use futures::StreamExt;

// ── Scripted provider ────────────────────────────────────────────────────

/// A provider that replays scripted responses and records every request.
struct ScriptedProvider {
    responses: Mutex<Vec<Result<Message, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(mut responses: Vec<Result<Message, ProviderError>>) -> Self {
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(Message::assistant(*t))).collect())
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let next = self
            .responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted at call #{index}"));
        Ok(ProviderResponse {
            message: next?,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "e2e-model".into(),
        })
    }
}

/// Prior turns the backend was given: everything except the system prompt
/// and the new user input.
fn history_len(request: &ProviderRequest) -> usize {
    let non_system = request.messages.iter().filter(|m| m.role != Role::System).count();
    non_system.saturating_sub(1)
}

fn system_prompt(request: &ProviderRequest) -> &str {
    request
        .messages
        .iter()
        .find(|m| m.role == Role::System)
        .map_or("", |m| m.content.as_str())
}

fn last_user(request: &ProviderRequest) -> &str {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map_or("", |m| m.content.as_str())
}

// ── Tools ────────────────────────────────────────────────────────────────

struct StockPriceTool;

#[async_trait::async_trait]
impl Tool for StockPriceTool {
    fn name(&self) -> &str {
        "get_stock_price"
    }

    fn description(&self) -> &str {
        "Latest closing price for a ticker"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "ticker": { "type": "string" } },
            "required": ["ticker"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let ticker = arguments["ticker"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("ticker is required".into()))?;
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!("{ticker}: 120.50"),
        })
    }
}

fn price_tool_call(ticker: &str) -> Message {
    let mut message = Message::assistant("");
    message.tool_calls = vec![MessageToolCall {
        id: format!("call_{ticker}"),
        name: "get_stock_price".into(),
        arguments: format!(r#"{{"ticker":"{ticker}"}}"#),
    }];
    message
}

// ── Setup ────────────────────────────────────────────────────────────────

fn library() -> Arc<AgentLibrary> {
    let library = AgentLibrary::new()
        .with_agent(
            AgentSpec::new("Market_Analyst", "You collect market data. Reply TERMINATE when done.")
                .with_toolsets(["market_data"]),
        )
        .unwrap()
        .with_agent(AgentSpec::new("Financial_Analyst", "You lead the analysis."))
        .unwrap();
    Arc::new(library)
}

fn factory(provider: Arc<ScriptedProvider>) -> AgentFactory {
    let toolsets =
        ToolsetRegistry::new().with_group("market_data", vec![Arc::new(StockPriceTool) as Arc<dyn Tool>]);
    AgentFactory::new(library(), toolsets, Arc::new(ProviderBackend::new(provider, "e2e-model")))
}

// ── Leader delegation ────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_leader_delegates_to_market_analyst() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "[Market_Analyst] fetch price",
        "NVDA closed at 120.50.",
        "NVDA is trading at 120.50. TERMINATE",
    ]));
    let mut workflow = leader_workflow(
        &factory(provider.clone()),
        "Financial_Analyst",
        &["Market_Analyst"],
        &WorkflowSettings::default(),
    )
    .unwrap();

    let response = workflow.chat("What is NVDA trading at?").await.unwrap();
    assert_eq!(response, "NVDA is trading at 120.50. TERMINATE");

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);

    assert_eq!(system_prompt(&requests[0]), "You lead the analysis.");
    assert_eq!(last_user(&requests[0]), "What is NVDA trading at?");

    assert!(system_prompt(&requests[1]).starts_with("You collect market data."));
    assert_eq!(last_user(&requests[1]), "fetch price");
    assert_eq!(requests[1].tools.len(), 1);

    assert_eq!(last_user(&requests[2]), "Result from Market_Analyst: NVDA closed at 120.50.");
    assert_eq!(history_len(&requests[2]), 2);
}

#[tokio::test]
async fn e2e_member_tool_rounds_stay_inside_the_backend() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Ok(Message::assistant("[Market_Analyst] fetch price")),
        Ok(price_tool_call("NVDA")),
        Ok(Message::assistant("NVDA: 120.50")),
        Ok(Message::assistant("Done. TERMINATE")),
    ]));
    let mut workflow = leader_workflow(
        &factory(provider.clone()),
        "Financial_Analyst",
        &["Market_Analyst"],
        &WorkflowSettings::default(),
    )
    .unwrap();

    let outcome = workflow.chat_detailed("price?").await.unwrap();
    assert_eq!(outcome.exchanges, 3);
    assert_eq!(outcome.text, "Done. TERMINATE");

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    let tool_turn = requests[2].messages.iter().find(|m| m.role == Role::Tool).unwrap();
    assert_eq!(tool_turn.content, "NVDA: 120.50");
    assert_eq!(last_user(&requests[3]), "Result from Market_Analyst: NVDA: 120.50");

    // user + tool call + tool result + final reply
    assert_eq!(workflow.member_thread("Market_Analyst").unwrap().len(), 4);
}

#[tokio::test]
async fn e2e_leader_without_marker_answers_directly() {
    let provider = Arc::new(ScriptedProvider::texts(&["EBITDA is earnings before interest, taxes, D&A."]));
    let mut workflow = leader_workflow(
        &factory(provider.clone()),
        "Financial_Analyst",
        &["Market_Analyst"],
        &WorkflowSettings::default(),
    )
    .unwrap();

    let response = workflow.chat("Define EBITDA").await.unwrap();
    assert_eq!(response, "EBITDA is earnings before interest, taxes, D&A.");
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn e2e_leader_marker_for_unknown_agent_degrades() {
    let provider = Arc::new(ScriptedProvider::texts(&["[NoSuchAgent] X"]));
    let mut workflow = leader_workflow(
        &factory(provider.clone()),
        "Financial_Analyst",
        &["Market_Analyst"],
        &WorkflowSettings::default(),
    )
    .unwrap();

    assert_eq!(workflow.chat("go").await.unwrap(), "[NoSuchAgent] X");
    assert_eq!(provider.requests().len(), 1);
}

// ── Single assistant ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_single_thread_accumulates_then_resets() {
    let provider = Arc::new(ScriptedProvider::texts(&["first", "second", "third"]));
    let mut workflow =
        single_assistant(&factory(provider.clone()), "Financial_Analyst", &WorkflowSettings::default()).unwrap();

    workflow.chat("A").await.unwrap();
    workflow.chat("B").await.unwrap();
    workflow.reset();
    workflow.chat("C").await.unwrap();

    let lengths: Vec<usize> = provider.requests().iter().map(history_len).collect();
    assert_eq!(lengths, vec![0, 2, 0]);
}

#[tokio::test]
async fn e2e_transport_error_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::RateLimited { retry_after_secs: 30 })]));
    let mut workflow =
        single_assistant(&factory(provider.clone()), "Financial_Analyst", &WorkflowSettings::default()).unwrap();

    let err = workflow.chat("hello").await.unwrap_err();
    assert!(matches!(err, Error::Provider(ProviderError::RateLimited { retry_after_secs: 30 })));
    assert_eq!(provider.requests().len(), 1);
    assert!(workflow.thread().is_empty());
}

#[tokio::test]
async fn e2e_streamed_reply_is_committed_once_complete() {
    let provider = Arc::new(ScriptedProvider::texts(&["Revenue grew 12%.", "Margins held."]));
    let mut workflow =
        single_assistant(&factory(provider.clone()), "Financial_Analyst", &WorkflowSettings::default()).unwrap();

    let mut stream = workflow.chat_stream("Summarize Q3").await.unwrap();
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        text.push_str(&fragment.unwrap());
    }
    drop(stream);
    assert_eq!(text, "Revenue grew 12%.");
    assert_eq!(workflow.thread().len(), 2);

    workflow.chat("And margins?").await.unwrap();
    let requests = provider.requests();
    assert!(requests[0].stream);
    assert_eq!(history_len(&requests[1]), 2);
}

#[test]
fn e2e_unknown_agent_lists_valid_names() {
    let provider = Arc::new(ScriptedProvider::texts(&[]));
    let err = single_assistant(&factory(provider), "Trader", &WorkflowSettings::default()).unwrap_err();

    assert!(matches!(err, ConfigurationError::UnknownAgent { .. }));
    let message = err.to_string();
    assert!(message.contains("Market_Analyst"));
    assert!(message.contains("Financial_Analyst"));
}

#[test]
fn e2e_missing_toolset_fails_construction() {
    let provider = Arc::new(ScriptedProvider::texts(&[]));
    let factory = AgentFactory::new(
        library(),
        ToolsetRegistry::new(),
        Arc::new(ProviderBackend::new(provider, "e2e-model")),
    );
    let err = single_assistant(&factory, "Market_Analyst", &WorkflowSettings::default()).unwrap_err();
    assert!(matches!(err, ConfigurationError::MissingToolset { ref toolset, .. } if toolset == "market_data"));
}

// ── RAG ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_rag_falls_back_when_retriever_cannot_open() {
    let provider = Arc::new(ScriptedProvider::texts(&["answer without context"]));
    let settings = WorkflowSettings::default();
    let retriever = DocumentRetriever::open("/definitely/not/here", settings.rag_chunk_size)
        .map(|r| Arc::new(r) as Arc<dyn Retriever>);
    assert!(matches!(retriever, Err(RetrievalError::Unavailable(_))));

    let mut workflow = rag_assistant(&factory(provider.clone()), "Financial_Analyst", retriever, &settings).unwrap();

    assert_eq!(workflow.chat("What are the risks?").await.unwrap(), "answer without context");
    assert_eq!(last_user(&provider.requests()[0]), "What are the risks?");
}

#[tokio::test]
async fn e2e_rag_grounds_prompt_in_documents() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("10k.md"),
        "Risk factors include export controls on data center GPUs.\n\nThe weather was pleasant.",
    )
    .unwrap();

    let provider = Arc::new(ScriptedProvider::texts(&["Export controls are the main risk."]));
    let settings = WorkflowSettings {
        rag_chunk_size: 60,
        ..WorkflowSettings::default()
    };
    let retriever = DocumentRetriever::open(dir.path(), settings.rag_chunk_size).map(|r| Arc::new(r) as Arc<dyn Retriever>);
    let mut workflow = rag_assistant(&factory(provider.clone()), "Financial_Analyst", retriever, &settings).unwrap();

    workflow.chat("export controls risk").await.unwrap();
    let prompt = last_user(&provider.requests()[0]).to_string();
    assert!(prompt.starts_with("Context from documents:\nRisk factors include export controls"));
    assert!(!prompt.contains("weather"));
    assert!(prompt.ends_with("User query: export controls risk\n"));
}

#[tokio::test]
async fn e2e_rag_without_hits_sends_raw_message() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "The weather was pleasant all quarter.").unwrap();

    let provider = Arc::new(ScriptedProvider::texts(&["no context needed"]));
    let settings = WorkflowSettings::default();
    let retriever = DocumentRetriever::open(dir.path(), settings.rag_chunk_size).map(|r| Arc::new(r) as Arc<dyn Retriever>);
    let mut workflow = rag_assistant(&factory(provider.clone()), "Financial_Analyst", retriever, &settings).unwrap();

    workflow.chat("NVDA margins").await.unwrap();
    assert_eq!(last_user(&provider.requests()[0]), "NVDA margins");
}

// ── Shadow ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_shadow_plans_then_executes() {
    let provider = Arc::new(ScriptedProvider::texts(&["1. Fetch price\n2. Compare to peers", "NVDA outperformed peers."]));
    let mut workflow =
        shadow_assistant(&factory(provider.clone()), "Market_Analyst", &WorkflowSettings::default()).unwrap();

    assert_eq!(workflow.chat("How did NVDA do?").await.unwrap(), "NVDA outperformed peers.");

    let requests = provider.requests();
    assert!(system_prompt(&requests[0]).starts_with("You are a planning agent."));
    assert!(requests[0].tools.is_empty());
    assert_eq!(last_user(&requests[0]), "create an execution plan for: How did NVDA do?");
    assert_eq!(
        last_user(&requests[1]),
        "1. Fetch price\n2. Compare to peers\n\noriginal request: How did NVDA do?"
    );
    assert_eq!(requests[1].tools.len(), 1);
}

#[tokio::test]
async fn e2e_shadow_planner_failure_aborts() {
    let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Network("connection reset".into()))]));
    let mut workflow =
        shadow_assistant(&factory(provider.clone()), "Market_Analyst", &WorkflowSettings::default()).unwrap();

    assert!(matches!(workflow.chat("go").await, Err(Error::Provider(ProviderError::Network(_)))));
    assert_eq!(provider.requests().len(), 1);
}

// ── Group ────────────────────────────────────────────────────────────────

fn alternate(transcript: &[TranscriptEntry], roster: &[String]) -> Option<String> {
    let spoken = transcript.iter().filter(|e| e.speaker != "user").count();
    Some(roster[spoken % roster.len()].clone())
}

#[tokio::test]
async fn e2e_group_round_budget_is_exact() {
    let provider = Arc::new(ScriptedProvider::texts(&["one", "two", "three", "never"]));
    let settings = WorkflowSettings::default().with_max_rounds(3);
    let mut workflow: MultiAssistant =
        multi_assistant(&factory(provider.clone()), &["Market_Analyst", "Financial_Analyst"], &settings)
            .unwrap()
            .with_selector(alternate);

    let result = workflow.chat_session("Discuss NVDA").await.unwrap();
    assert_eq!(result.rounds, 3);
    assert_eq!(result.stop_reason, StopReason::MaxRounds);
    assert_eq!(provider.requests().len(), 3);
    assert_eq!(result.text(), "one\n\ntwo\n\nthree");
}

#[tokio::test]
async fn e2e_group_manager_selects_until_terminate() {
    let provider = Arc::new(ScriptedProvider::texts(&[
        "Market_Analyst",
        "NVDA is at 120.50.",
        "Financial_Analyst",
        "Valuation is rich. TERMINATE",
    ]));
    let mut workflow = multi_assistant(
        &factory(provider.clone()),
        &["Market_Analyst", "Financial_Analyst"],
        &WorkflowSettings::default(),
    )
    .unwrap();

    let response = workflow.chat("Assess NVDA").await.unwrap();
    assert_eq!(response, "NVDA is at 120.50.\n\nValuation is rich. TERMINATE");

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    assert_eq!(system_prompt(&requests[0]), "Select the most appropriate expert for the current task.");
    assert_eq!(last_user(&requests[1]), "user: Assess NVDA");
    assert_eq!(last_user(&requests[3]), "user: Assess NVDA\n\nMarket_Analyst: NVDA is at 120.50.");
}

// ── Configuration ────────────────────────────────────────────────────────

#[test]
fn e2e_config_drives_library_and_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_temperature = 0.2

[workflow]
max_rounds = 4
max_turns = 3

[[agents]]
name = "Credit_Analyst"
description = "Assesses credit risk"
instructions = "You assess credit risk."
"#,
    )
    .unwrap();

    let config = AppConfig::load_from(&path).unwrap();
    let mut library = AgentLibrary::builtin();
    library.extend_from_config(config.agents.iter().cloned());
    assert!(library.contains("Credit_Analyst"));
    assert!(library.contains("Market_Analyst"));

    let settings = WorkflowSettings::from_config(&config);
    assert_eq!(settings.max_rounds, 4);
    assert_eq!(settings.send.max_turns, 3);
    assert_eq!(settings.send.temperature, 0.2);
}
