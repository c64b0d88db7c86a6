//! Provider registry: maps a provider id and agent purpose to a client.
//!
//! The mapping is an exhaustive match over [`ProviderId`], so adding a
//! provider without wiring its models is a compile error rather than a
//! runtime fallback.

use std::sync::Arc;

use apploom_traits::{AgentPurpose, ProviderId};

use crate::error::Result;
use crate::llm::anthropic::AnthropicClient;
use crate::llm::client::LlmClient;
use crate::llm::openai::OpenAiCompatibleClient;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
const GROK_BASE_URL: &str = "https://api.x.ai/v1";
const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Builds an LLM client for a provider, key and purpose.
///
/// Workflows depend on this trait so tests can substitute scripted clients.
pub trait ModelFactory: Send + Sync {
    fn client(
        &self,
        provider: ProviderId,
        api_key: &str,
        purpose: AgentPurpose,
    ) -> Result<Arc<dyn LlmClient>>;
}

/// Production factory over the supported provider set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderRegistry;

impl ProviderRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Model identifier used for a provider/purpose pair.
    pub fn model_for(provider: ProviderId, purpose: AgentPurpose) -> &'static str {
        match provider {
            ProviderId::Gemini => "gemini-2.0-flash",
            ProviderId::OpenAi => "gpt-4o-mini",
            ProviderId::Anthropic => match purpose {
                AgentPurpose::Code => "claude-3-5-sonnet-latest",
                AgentPurpose::Title | AgentPurpose::Response => "claude-3-5-haiku-latest",
            },
            ProviderId::Grok => "grok-2-latest",
            ProviderId::OpenRouter => match purpose {
                AgentPurpose::Code => "mistralai/devstral-2512:free",
                AgentPurpose::Title | AgentPurpose::Response => {
                    "mistralai/mistral-7b-instruct:free"
                }
            },
        }
    }
}

impl ModelFactory for ProviderRegistry {
    fn client(
        &self,
        provider: ProviderId,
        api_key: &str,
        purpose: AgentPurpose,
    ) -> Result<Arc<dyn LlmClient>> {
        let model = Self::model_for(provider, purpose);

        let client: Arc<dyn LlmClient> = match provider {
            ProviderId::Gemini => Arc::new(
                OpenAiCompatibleClient::new(api_key)
                    .with_base_url(GEMINI_BASE_URL)
                    .with_provider_name("gemini")
                    .with_model(model),
            ),
            ProviderId::OpenAi => Arc::new(OpenAiCompatibleClient::new(api_key).with_model(model)),
            ProviderId::Anthropic => {
                let max_tokens = match purpose {
                    AgentPurpose::Code => 4096,
                    AgentPurpose::Title | AgentPurpose::Response => 1024,
                };
                Arc::new(
                    AnthropicClient::new(api_key)
                        .with_model(model)
                        .with_default_max_tokens(max_tokens),
                )
            }
            ProviderId::Grok => Arc::new(
                OpenAiCompatibleClient::new(api_key)
                    .with_base_url(GROK_BASE_URL)
                    .with_provider_name("grok")
                    .with_model(model),
            ),
            ProviderId::OpenRouter => Arc::new(
                OpenAiCompatibleClient::new(api_key)
                    .with_base_url(OPENROUTER_BASE_URL)
                    .with_provider_name("openrouter")
                    .with_model(model),
            ),
        };

        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_yields_a_client_for_every_purpose() {
        let registry = ProviderRegistry::new();
        for provider in ProviderId::ALL {
            for purpose in [AgentPurpose::Code, AgentPurpose::Title, AgentPurpose::Response] {
                let client = registry
                    .client(provider, "test-key", purpose)
                    .expect("client should build");
                assert!(!client.model().is_empty());
            }
        }
    }

    #[test]
    fn code_models_differ_from_utility_models_where_providers_tier() {
        assert_eq!(
            ProviderRegistry::model_for(ProviderId::Anthropic, AgentPurpose::Code),
            "claude-3-5-sonnet-latest"
        );
        assert_eq!(
            ProviderRegistry::model_for(ProviderId::Anthropic, AgentPurpose::Title),
            "claude-3-5-haiku-latest"
        );
        assert_eq!(
            ProviderRegistry::model_for(ProviderId::OpenRouter, AgentPurpose::Code),
            "mistralai/devstral-2512:free"
        );
        assert_eq!(
            ProviderRegistry::model_for(ProviderId::Gemini, AgentPurpose::Response),
            "gemini-2.0-flash"
        );
    }
}
