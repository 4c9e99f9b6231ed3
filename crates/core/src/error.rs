//! Error types for the fincrew domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all fincrew operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Backend transport errors (passed through untouched) ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Construction-time configuration errors ---
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigurationError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Orchestration errors ---
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of a single backend exchange (network, auth, quota, ...).
///
/// The orchestrator never retries these and never rewrites them.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Fatal errors raised while wiring agents together.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Unknown agent '{name}'. Available agents: {}", available.join(", "))]
    UnknownAgent { name: String, available: Vec<String> },

    #[error(
        "Agent '{agent}' references toolset '{toolset}' which is not registered. Available toolsets: {}",
        available.join(", ")
    )]
    MissingToolset {
        agent: String,
        toolset: String,
        available: Vec<String>,
    },

    #[error("Agent '{0}' is defined more than once")]
    DuplicateAgent(String),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Errors raised by the coordination patterns themselves.
#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("Selector chose '{name}', which is not in the roster ({})", roster.join(", "))]
    UnknownSpeaker { name: String, roster: Vec<String> },

    #[error("Thread owned by '{thread_owner}' cannot be used by agent '{agent}'")]
    ThreadOwnership { thread_owner: String, agent: String },

    #[error("Workflow needs at least one agent")]
    EmptyRoster,
}

/// Retrieval failures. Always absorbed by the RAG pattern.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Retriever unavailable: {0}")]
    Unavailable(String),

    #[error("Retrieval failed: {0}")]
    Failed(String),
}
