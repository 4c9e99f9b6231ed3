//! LLM provider implementations for fincrew.
//!
//! All providers implement the `fincrew_core::Provider` trait. The router
//! selects the active provider from configuration, and [`ProviderBackend`]
//! turns it into the backend collaborator that agent handles talk to.

pub mod backend;
pub mod openai_compat;
pub mod router;

pub use backend::ProviderBackend;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
