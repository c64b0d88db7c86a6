//! Iterative tool-calling loop around a single agent.
//!
//! Each iteration is one LLM completion followed by sequential execution of
//! every tool call the model requested. A router inspects the shared state
//! after each iteration and stops the loop once a summary has been captured.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::agent::state::{GenerationState, SharedState};
use crate::error::Result;
use crate::llm::{CompletionRequest, Message};
use crate::tools::ToolRegistry;

/// Default iteration ceiling for the code agent.
pub const MAX_ITERATIONS: usize = 15;

/// Marker the code agent emits in front of its final summary.
pub const TASK_SUMMARY_MARKER: &str = "<task_summary>";

/// How assistant text is promoted into the shared summary.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminationPolicy {
    /// Only text containing the marker counts as a summary.
    OnMarker(&'static str),
    /// Any non-empty assistant text counts (single-shot planning agent).
    AnyText,
}

/// Router decision after one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteDecision {
    Continue,
    Stop,
}

/// Pure router: keep iterating until a summary has been captured.
pub fn route(state: &GenerationState) -> RouteDecision {
    if state.has_summary() {
        RouteDecision::Stop
    } else {
        RouteDecision::Continue
    }
}

/// Snapshot of the shared state when the loop ended.
#[derive(Debug, Clone)]
pub struct NetworkOutcome {
    pub state: GenerationState,
    pub iterations: usize,
}

/// Agent network: one agent, its tools, shared state and a router.
pub struct AgentNetwork {
    agent: Agent,
    tools: Arc<ToolRegistry>,
    state: SharedState,
    history: Vec<Message>,
    max_iterations: usize,
    termination: TerminationPolicy,
}

impl AgentNetwork {
    pub fn new(agent: Agent, tools: Arc<ToolRegistry>, state: SharedState) -> Self {
        Self {
            agent,
            tools,
            state,
            history: Vec::new(),
            max_iterations: MAX_ITERATIONS,
            termination: TerminationPolicy::OnMarker(TASK_SUMMARY_MARKER),
        }
    }

    /// Seed the conversation with prior project messages, oldest first.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    async fn capture_summary(&self, content: &str) {
        let captured = match &self.termination {
            TerminationPolicy::OnMarker(marker) => content.contains(marker),
            TerminationPolicy::AnyText => !content.trim().is_empty(),
        };
        if captured {
            let mut state = self.state.lock().await;
            state.summary = content.to_string();
        }
    }

    /// Run the loop for one user input. The shared state carries the result;
    /// the returned outcome is a snapshot of it.
    pub async fn run(&self, input: &str) -> Result<NetworkOutcome> {
        let mut messages = vec![Message::system(self.agent.system())];
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(input));

        let schemas = self.tools.schemas();
        let mut iterations = 0;

        for iteration in 0..self.max_iterations {
            let request = CompletionRequest::new(messages.clone()).with_tools(schemas.clone());
            let response = self.agent.llm().complete(request).await?;
            iterations = iteration + 1;

            if let Some(content) = &response.content
                && !content.is_empty()
            {
                self.capture_summary(content).await;
            }

            debug!(
                agent = self.agent.name(),
                iteration = iterations,
                tool_calls = response.tool_calls.len(),
                "Agent iteration complete"
            );

            if response.tool_calls.is_empty() {
                if let Some(content) = response.content {
                    messages.push(Message::assistant(content));
                }
            } else {
                messages.push(Message::assistant_with_tool_calls(
                    response.content.clone(),
                    response.tool_calls.clone(),
                ));

                // Tools run sequentially, in request order, so later calls in
                // the same iteration observe earlier calls' state updates.
                for call in &response.tool_calls {
                    let content = match self.tools.execute(&call.name, call.arguments.clone()).await
                    {
                        Ok(output) => output.as_llm_content(),
                        Err(e) => {
                            warn!(tool = %call.name, error = %e, "Tool execution failed");
                            format!("Error: {e}")
                        }
                    };
                    messages.push(Message::tool_result(call.id.clone(), content));
                }
            }

            if route(&*self.state.lock().await) == RouteDecision::Stop {
                break;
            }
        }

        let state = self.state.lock().await.clone();
        info!(
            agent = self.agent.name(),
            iterations,
            files = state.files.len(),
            has_summary = state.has_summary(),
            "Agent network finished"
        );
        Ok(NetworkOutcome { state, iterations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::shared_state;
    use crate::llm::{MockLlmClient, MockStep};
    use apploom_traits::{Tool, ToolOutput};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTool {
        calls: Arc<AtomicUsize>,
        state: SharedState,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str {
            "createOrUpdateFiles"
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, _input: Value) -> apploom_traits::Result<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut state = self.state.lock().await;
            state
                .files
                .insert("app/page.tsx".to_string(), "content".to_string());
            Ok(ToolOutput::success(json!({"app/page.tsx": "content"})))
        }
    }

    fn network_with(
        steps: Vec<MockStep>,
        state: SharedState,
        calls: Arc<AtomicUsize>,
    ) -> AgentNetwork {
        let llm = Arc::new(MockLlmClient::from_steps("mock", steps));
        let agent = Agent::new("code-agent", "You build apps.", llm);
        let mut tools = ToolRegistry::new();
        tools.register(CountingTool {
            calls,
            state: state.clone(),
        });
        AgentNetwork::new(agent, Arc::new(tools), state)
    }

    #[tokio::test]
    async fn loop_stops_on_task_summary_marker() {
        let state = shared_state();
        let calls = Arc::new(AtomicUsize::new(0));
        let network = network_with(
            vec![
                MockStep::tool_call("c1", "createOrUpdateFiles", json!({})),
                MockStep::text("<task_summary>Built the page.</task_summary>"),
                MockStep::text("should never be reached"),
            ],
            state.clone(),
            calls.clone(),
        );

        let outcome = network.run("build a page").await.unwrap();
        assert_eq!(outcome.iterations, 2);
        assert!(outcome.state.summary.contains("<task_summary>"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn text_without_marker_does_not_terminate() {
        let state = shared_state();
        let calls = Arc::new(AtomicUsize::new(0));
        let network = network_with(
            vec![
                MockStep::text("still thinking about it"),
                MockStep::text("<task_summary>done</task_summary>"),
            ],
            state.clone(),
            calls.clone(),
        );

        let outcome = network.run("build").await.unwrap();
        assert_eq!(outcome.iterations, 2);
    }

    #[tokio::test]
    async fn loop_respects_iteration_ceiling() {
        let state = shared_state();
        let calls = Arc::new(AtomicUsize::new(0));
        // Script 20 tool-call iterations; the loop must stop at 15.
        let steps = (0..20)
            .map(|i| MockStep::tool_call(format!("c{i}"), "createOrUpdateFiles", json!({})))
            .collect();
        let network = network_with(steps, state.clone(), calls.clone());

        let outcome = network.run("build").await.unwrap();
        assert_eq!(outcome.iterations, MAX_ITERATIONS);
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ITERATIONS);
        assert!(outcome.state.is_failure());
    }

    #[tokio::test]
    async fn any_text_policy_terminates_on_first_message() {
        let state = shared_state();
        let calls = Arc::new(AtomicUsize::new(0));
        let network = network_with(
            vec![MockStep::text("1. Create a page\n2. Style it")],
            state.clone(),
            calls.clone(),
        )
        .with_max_iterations(1)
        .with_termination(TerminationPolicy::AnyText);

        let outcome = network.run("plan this").await.unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.state.summary, "1. Create a page\n2. Style it");
    }

    #[tokio::test]
    async fn llm_errors_propagate() {
        let state = shared_state();
        let calls = Arc::new(AtomicUsize::new(0));
        let network = network_with(
            vec![MockStep::error("provider exploded")],
            state,
            calls,
        );

        assert!(network.run("build").await.is_err());
    }
}
