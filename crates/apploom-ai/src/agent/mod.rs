//! Agents and the iterative tool-calling network that drives them.

pub mod network;
pub mod state;

pub use network::{AgentNetwork, NetworkOutcome, RouteDecision, TerminationPolicy, route};
pub use state::{GenerationState, SharedState, shared_state};

use std::sync::Arc;

use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, Message};

/// A named agent: a system prompt bound to an LLM client.
pub struct Agent {
    name: String,
    system: String,
    llm: Arc<dyn LlmClient>,
}

impl Agent {
    pub fn new(
        name: impl Into<String>,
        system: impl Into<String>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            name: name.into(),
            system: system.into(),
            llm,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    /// One-shot completion without tools. Returns the assistant text, if any.
    ///
    /// Used for the utility agents (fragment titles, user-facing responses)
    /// that never touch the sandbox.
    pub async fn generate(&self, input: &str) -> Result<Option<String>> {
        let request = CompletionRequest::new(vec![
            Message::system(&self.system),
            Message::user(input),
        ]);
        let response = self.llm.complete(request).await?;
        Ok(response.content.filter(|c| !c.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, MockStep};

    #[tokio::test]
    async fn generate_returns_text_content() {
        let llm = Arc::new(MockLlmClient::from_steps(
            "mock",
            vec![MockStep::text("Landing Page")],
        ));
        let agent = Agent::new("title", "You generate titles.", llm);

        let title = agent.generate("summarize this").await.unwrap();
        assert_eq!(title.as_deref(), Some("Landing Page"));
    }

    #[tokio::test]
    async fn generate_treats_blank_output_as_none() {
        let llm = Arc::new(MockLlmClient::from_steps("mock", vec![MockStep::text("  ")]));
        let agent = Agent::new("title", "You generate titles.", llm);

        assert!(agent.generate("summarize this").await.unwrap().is_none());
    }
}
