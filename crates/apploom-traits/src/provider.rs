//! Closed set of supported AI providers and agent purposes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported AI providers. The wire form is SCREAMING_SNAKE_CASE to match
/// the values stored in user settings rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "GEMINI")]
    Gemini,
    #[serde(rename = "OPENAI")]
    OpenAi,
    #[serde(rename = "ANTHROPIC")]
    Anthropic,
    #[serde(rename = "GROK")]
    Grok,
    #[serde(rename = "OPENROUTER")]
    OpenRouter,
}

impl ProviderId {
    /// Every supported provider, used to validate registries exhaustively.
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Gemini,
        ProviderId::OpenAi,
        ProviderId::Anthropic,
        ProviderId::Grok,
        ProviderId::OpenRouter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "GEMINI",
            ProviderId::OpenAi => "OPENAI",
            ProviderId::Anthropic => "ANTHROPIC",
            ProviderId::Grok => "GROK",
            ProviderId::OpenRouter => "OPENROUTER",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "GEMINI" => Ok(ProviderId::Gemini),
            "OPENAI" => Ok(ProviderId::OpenAi),
            "ANTHROPIC" => Ok(ProviderId::Anthropic),
            "GROK" => Ok(ProviderId::Grok),
            "OPENROUTER" => Ok(ProviderId::OpenRouter),
            other => Err(format!("unknown provider: {other}")),
        }
    }
}

/// What a model is being constructed for. Providers may pick a different
/// model or parameter set per purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentPurpose {
    /// The coding agent driving the sandbox tools.
    Code,
    /// One-shot fragment title generation.
    Title,
    /// One-shot user-facing response generation.
    Response,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_roundtrip_through_str() {
        for provider in ProviderId::ALL {
            let parsed: ProviderId = provider.as_str().parse().unwrap();
            assert_eq!(parsed, provider);
        }
    }

    #[test]
    fn unknown_provider_is_rejected() {
        assert!("MISTRAL".parse::<ProviderId>().is_err());
    }

    #[test]
    fn serde_wire_form_matches_as_str() {
        for provider in ProviderId::ALL {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{}\"", provider.as_str()));
        }
    }
}
