//! Apploom AI - LLM clients, the code-agent loop and its sandbox tools.
//!
//! Layout mirrors the rest of the workspace: `llm` holds provider clients
//! behind the [`llm::LlmClient`] trait, `agent` holds the iterative
//! tool-calling loop and its shared state, and `tools` holds the sandbox
//! tool set the loop drives.

pub mod agent;
pub mod error;
pub mod llm;
pub mod tools;

pub use agent::{Agent, AgentNetwork, GenerationState, NetworkOutcome, SharedState};
pub use error::{AiError, Result};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, Message, ProviderRegistry};
pub use tools::ToolRegistry;
