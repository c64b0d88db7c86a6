//! Generate workflow: the full code-agent pipeline against a sandbox.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use apploom_ai::agent::{Agent, AgentNetwork, shared_state};
use apploom_ai::tools::{CreateOrUpdateFilesTool, ReadFilesTool, TerminalTool, ToolRegistry};
use apploom_storage::{FragmentRecord, MessageKind, MessageRecord, MessageRole, StepRunner};
use apploom_traits::AgentPurpose;

use crate::health::ensure_app_serving;
use crate::prompts::{CODE_PROMPT, FRAGMENT_TITLE_PROMPT, RESPONSE_PROMPT};
use crate::workflow::{CredentialOutcome, WorkflowContext};

const GENERATE_HISTORY_WINDOW: usize = 10;
const TITLE_FALLBACK: &str = "Fragment";
const RESPONSE_FALLBACK: &str = "Here you go!";
const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone)]
pub enum GenerateOutcome {
    Generated {
        url: String,
        title: String,
        summary: String,
        files: BTreeMap<String, String>,
    },
    Failed,
    MissingApiKey,
}

pub async fn run_generate(
    ctx: &WorkflowContext,
    steps: &StepRunner,
    project_id: &str,
    value: &str,
) -> Result<GenerateOutcome> {
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
            info!(project_id, "Generate run ended: no API key configured");
            return Ok(GenerateOutcome::MissingApiKey);
        }
    };

    // The sandbox id is the durable handle: creation happens at most once
    // per run, and every later phase reconnects by id.
    let sandbox_id: String = steps
        .run("get-sandbox", async {
            let sandbox = ctx
                .gateway
                .create(&ctx.config.sandbox_template, ctx.config.sandbox_idle_timeout)
                .await?;
            Ok(sandbox.id().to_string())
        })
        .await?;
    let sandbox = ctx.gateway.reconnect(&sandbox_id).await?;

    let history = ctx.conversation_history(project_id, GENERATE_HISTORY_WINDOW)?;

    let state = shared_state();
    let mut tools = ToolRegistry::new();
    tools.register(
        TerminalTool::new(sandbox.clone(), steps.clone())
            .with_timeout(ctx.config.command_timeout),
    );
    tools.register(CreateOrUpdateFilesTool::new(
        sandbox.clone(),
        state.clone(),
        steps.clone(),
    ));
    tools.register(ReadFilesTool::new(sandbox.clone(), steps.clone()));

    let llm = ctx.models.client(provider, &api_key, AgentPurpose::Code)?;
    let agent = Agent::new("code-agent", CODE_PROMPT, llm);
    let network = AgentNetwork::new(agent, Arc::new(tools), state.clone()).with_history(history);

    // An LLM transport failure mid-loop is a content failure of this run,
    // not a workflow crash: the user still gets the generic error message.
    let final_state = match network.run(value).await {
        Ok(outcome) => outcome.state,
        Err(e) => {
            error!(project_id, error = %e, "Agent network failed");
            state.lock().await.clone()
        }
    };

    let title_agent = Agent::new(
        "fragment-title-generator",
        FRAGMENT_TITLE_PROMPT,
        ctx.models.client(provider, &api_key, AgentPurpose::Title)?,
    );
    let response_agent = Agent::new(
        "response-generator",
        RESPONSE_PROMPT,
        ctx.models.client(provider, &api_key, AgentPurpose::Response)?,
    );

    let title: Option<String> = steps
        .run("generate-fragment-title", async {
            title_agent
                .generate(&final_state.summary)
                .await
                .map_err(anyhow::Error::from)
        })
        .await?;
    let response: Option<String> = steps
        .run("generate-response", async {
            response_agent
                .generate(&final_state.summary)
                .await
                .map_err(anyhow::Error::from)
        })
        .await?;

    let title = title.unwrap_or_else(|| TITLE_FALLBACK.to_string());
    let response = response.unwrap_or_else(|| RESPONSE_FALLBACK.to_string());

    let is_failure = final_state.is_failure();

    let sandbox_url: String = steps
        .run("get-sandbox-url", async {
            Ok(ensure_app_serving(&sandbox, ctx.config.app_port).await)
        })
        .await?;

    steps
        .run("save-result", async {
            if is_failure {
                error!(project_id, summary = %final_state.summary, "Generation failed");
                let record = MessageRecord::new(
                    project_id,
                    GENERIC_FAILURE_MESSAGE,
                    MessageRole::Assistant,
                    MessageKind::Error,
                );
                ctx.storage.messages.create(&record)?;
                return Ok(record.id);
            }

            let record = MessageRecord::new(
                project_id,
                &response,
                MessageRole::Assistant,
                MessageKind::Result,
            );
            ctx.storage.messages.create(&record)?;

            let fragment = FragmentRecord::new(
                &record.id,
                &sandbox_id,
                &sandbox_url,
                &title,
                final_state.files.clone(),
            );
            ctx.storage.fragments.create(&fragment)?;
            Ok(record.id)
        })
        .await?;

    if is_failure {
        return Ok(GenerateOutcome::Failed);
    }

    info!(project_id, sandbox_id, "Generation complete");
    Ok(GenerateOutcome::Generated {
        url: sandbox_url,
        title,
        summary: final_state.summary,
        files: final_state.files,
    })
}
