//! Plan workflow: produce an implementation plan without a sandbox.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use apploom_ai::agent::{Agent, AgentNetwork, TerminationPolicy, shared_state};
use apploom_ai::tools::ToolRegistry;
use apploom_storage::{MessageKind, MessageRecord, MessageRole, StepRunner};
use apploom_traits::AgentPurpose;

use crate::prompts::PLANNING_PROMPT;
use crate::workflow::{CredentialOutcome, WorkflowContext};

const PLAN_HISTORY_WINDOW: usize = 5;
const PLAN_FALLBACK: &str = "Failed to generate plan.";

#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Planned { plan: String },
    MissingApiKey,
}

pub async fn run_plan(
    ctx: &WorkflowContext,
    steps: &StepRunner,
    project_id: &str,
    value: &str,
) -> Result<PlanOutcome> {
    let project = ctx.find_project(project_id)?;

    let (provider, api_key) = match ctx.resolve_credentials(&project.user_id)? {
        CredentialOutcome::Resolved { provider, api_key } => (provider, api_key),
        CredentialOutcome::Missing { message } => {
            steps
                .run("save-missing-api-key-message", async {
                    let record = MessageRecord::new(
                        project_id,
                        &message,
                        MessageRole::Assistant,
                        MessageKind::Error,
                    );
                    ctx.storage.messages.create(&record)?;
                    Ok(record.id)
                })
                .await?;
            info!(project_id, "Plan run ended: no API key configured");
            return Ok(PlanOutcome::MissingApiKey);
        }
    };

    let history = ctx.conversation_history(project_id, PLAN_HISTORY_WINDOW)?;

    let llm = ctx.models.client(provider, &api_key, AgentPurpose::Code)?;
    let agent = Agent::new("plan-agent", PLANNING_PROMPT, llm);
    let state = shared_state();
    let network = AgentNetwork::new(agent, Arc::new(ToolRegistry::new()), state)
        .with_history(history)
        .with_max_iterations(1)
        .with_termination(TerminationPolicy::AnyText);

    let outcome = network.run(value).await?;
    let plan = if outcome.state.has_summary() {
        outcome.state.summary
    } else {
        PLAN_FALLBACK.to_string()
    };

    steps
        .run("save-plan", async {
            let record =
                MessageRecord::new(project_id, &plan, MessageRole::Assistant, MessageKind::Plan);
            ctx.storage.messages.create(&record)?;
            Ok(record.id)
        })
        .await?;

    info!(project_id, iterations = outcome.iterations, "Plan saved");
    Ok(PlanOutcome::Planned { plan })
}
