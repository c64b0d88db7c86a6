//! Client for the Anthropic messages API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{AiError, Result};
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, Role, TokenUsage,
    ToolCall,
};
use crate::llm::retry::{LlmRetryConfig, error_from_response, wait_before_retry};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    model: String,
    default_max_tokens: u32,
    retry_config: LlmRetryConfig,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            model: "claude-3-5-sonnet-latest".to_string(),
            default_max_tokens: 4096,
            retry_config: LlmRetryConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Max tokens used when the request does not set one. The messages API
    /// requires the field on every request.
    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    pub fn with_retry_config(mut self, config: LlmRetryConfig) -> Self {
        self.retry_config = config;
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiTool>>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Serialize)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<OutBlock>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<InBlock>,
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Map one non-system chat message onto the messages-API shape. Tool
/// results become user-role tool_result blocks; assistant tool calls
/// become tool_use blocks after any leading text.
fn api_message(message: &Message) -> ApiMessage {
    if message.role == Role::Tool {
        return ApiMessage {
            role: "user",
            content: ApiContent::Blocks(vec![OutBlock::ToolResult {
                tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                content: message.content.clone(),
            }]),
        };
    }

    let role = if message.role == Role::Assistant {
        "assistant"
    } else {
        "user"
    };

    let Some(tool_calls) = &message.tool_calls else {
        return ApiMessage {
            role,
            content: ApiContent::Text(message.content.clone()),
        };
    };

    let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
    if !message.content.is_empty() {
        blocks.push(OutBlock::Text {
            text: message.content.clone(),
        });
    }
    for call in tool_calls {
        blocks.push(OutBlock::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
        });
    }

    ApiMessage {
        role,
        content: ApiContent::Blocks(blocks),
    }
}

fn parse_response(data: MessagesResponse) -> CompletionResponse {
    let mut content = None;
    let mut tool_calls = Vec::new();

    for block in data.content {
        match block {
            InBlock::Text { text } => content = Some(text),
            InBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id,
                name,
                arguments: input,
            }),
            InBlock::Other => {}
        }
    }

    let finish_reason = match data.stop_reason.as_deref() {
        Some("tool_use") => FinishReason::ToolCalls,
        Some("max_tokens") => FinishReason::MaxTokens,
        _ => FinishReason::Stop,
    };

    CompletionResponse {
        content,
        tool_calls,
        finish_reason,
        usage: Some(TokenUsage {
            prompt_tokens: data.usage.input_tokens,
            completion_tokens: data.usage.output_tokens,
            total_tokens: data.usage.input_tokens + data.usage.output_tokens,
        }),
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let system = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());

        let tools = (!request.tools.is_empty()).then(|| {
            request
                .tools
                .iter()
                .map(|schema| ApiTool {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    input_schema: schema.parameters.clone(),
                })
                .collect()
        });

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(self.default_max_tokens),
            system,
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(api_message)
                .collect(),
            tools,
        };

        for attempt in 0..=self.retry_config.max_retries {
            let last = attempt == self.retry_config.max_retries;

            let response = match self
                .client
                .post(MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    let error = AiError::Http(e);
                    if last || !error.is_retryable() {
                        return Err(error);
                    }
                    wait_before_retry(&self.retry_config, "anthropic", attempt + 1, None).await;
                    continue;
                }
            };

            if !response.status().is_success() {
                let error = error_from_response(response, "anthropic").await;
                if last || !error.is_retryable() {
                    return Err(error);
                }
                wait_before_retry(
                    &self.retry_config,
                    "anthropic",
                    attempt + 1,
                    error.retry_after(),
                )
                .await;
                continue;
            }

            return Ok(parse_response(response.json().await?));
        }

        Err(AiError::Llm(
            "anthropic request failed after retries".to_string(),
        ))
    }
}
