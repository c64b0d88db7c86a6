//! LLM provider clients.

pub mod anthropic;
pub mod client;
pub mod mock_client;
pub mod openai;
pub mod registry;
pub mod retry;

pub use anthropic::AnthropicClient;
pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
    ToolCall,
};
pub use mock_client::{MockLlmClient, MockStep};
pub use openai::OpenAiCompatibleClient;
pub use registry::{ModelFactory, ProviderRegistry};
pub use retry::LlmRetryConfig;
