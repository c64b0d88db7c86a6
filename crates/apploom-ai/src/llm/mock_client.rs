//! Scripted mock LLM client for agent-loop and workflow tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AiError, Result};

use super::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Role, TokenUsage, ToolCall,
};

/// One scripted completion.
#[derive(Debug, Clone)]
pub enum MockStep {
    Text(String),
    ToolCall(ToolCall),
    Error(String),
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self::ToolCall(ToolCall {
            id: id.into(),
            name: name.into(),
            arguments,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }
}

/// Plays back a script of [`MockStep`]s, one per `complete` call. An
/// exhausted script echoes the last user message, so a loop that runs
/// longer than scripted fails on content instead of hanging.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_steps(model, Vec::new())
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(steps.into())),
        }
    }

    fn text_response(content: String) -> CompletionResponse {
        let usage = TokenUsage {
            prompt_tokens: 1,
            completion_tokens: content.len() as u32,
            total_tokens: 1 + content.len() as u32,
        };
        CompletionResponse {
            content: Some(content),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Some(usage),
        }
    }

    fn echo(request: &CompletionRequest) -> CompletionResponse {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());
        Self::text_response(text)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let step = self.script.lock().await.pop_front();
        match step {
            None => Ok(Self::echo(&request)),
            Some(MockStep::Text(content)) => Ok(Self::text_response(content)),
            Some(MockStep::ToolCall(call)) => Ok(CompletionResponse {
                content: None,
                tool_calls: vec![call],
                finish_reason: FinishReason::ToolCalls,
                usage: None,
            }),
            Some(MockStep::Error(message)) => Err(AiError::Llm(message)),
        }
    }
}
