//! Event dispatch: fire-and-forget triggers for the workflows.
//!
//! Each accepted event gets a fresh run id, which doubles as the durable
//! step-log key; resuming a crashed run with the same id replays completed
//! steps.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

use apploom_storage::StepRunner;

use crate::workflow::{WorkflowContext, run_generate, run_plan};

const EVENT_QUEUE_DEPTH: usize = 64;

/// Events the orchestrator reacts to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum CodeAgentEvent {
    /// `code-agent/plan`: produce a plan message.
    Plan { project_id: String, value: String },
    /// `code-agent/generate`: run the full generation pipeline.
    Generate { project_id: String, value: String },
    /// `code-agent/run`: legacy combined path; runs generation directly.
    Run { project_id: String, value: String },
}

struct DispatchedEvent {
    run_id: String,
    event: CodeAgentEvent,
}

/// Accepts events and runs their workflows on a background task.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: mpsc::Sender<DispatchedEvent>,
}

impl EventDispatcher {
    /// Spawn the dispatch loop. Each event runs on its own task so one slow
    /// generation does not block the queue.
    pub fn spawn(ctx: Arc<WorkflowContext>) -> Self {
        let (tx, mut rx) = mpsc::channel::<DispatchedEvent>(EVENT_QUEUE_DEPTH);

        tokio::spawn(async move {
            while let Some(dispatched) = rx.recv().await {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    if let Err(e) = execute(&ctx, &dispatched.run_id, dispatched.event).await {
                        error!(run_id = %dispatched.run_id, error = %e, "Workflow run failed");
                    }
                });
            }
        });

        Self { tx }
    }

    /// Queue an event under a fresh run id. Returns the run id so callers
    /// can resume the run after a crash.
    pub async fn send(&self, event: CodeAgentEvent) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        self.resume(run_id.clone(), event).await?;
        Ok(run_id)
    }

    /// Queue an event under an existing run id, replaying completed steps.
    pub async fn resume(&self, run_id: String, event: CodeAgentEvent) -> Result<()> {
        self.tx
            .send(DispatchedEvent { run_id, event })
            .await
            .map_err(|_| anyhow::anyhow!("Event dispatcher is shut down"))
    }
}

/// Run one workflow to completion under its run id.
pub async fn execute(ctx: &WorkflowContext, run_id: &str, event: CodeAgentEvent) -> Result<()> {
    let steps = StepRunner::new(ctx.storage.steps.clone(), run_id);

    match event {
        CodeAgentEvent::Plan { project_id, value } => {
            info!(run_id, project_id, "Running plan workflow");
            run_plan(ctx, &steps, &project_id, &value).await?;
        }
        CodeAgentEvent::Generate { project_id, value }
        | CodeAgentEvent::Run { project_id, value } => {
            info!(run_id, project_id, "Running generate workflow");
            run_generate(ctx, &steps, &project_id, &value).await?;
        }
    }

    // The run finished; its step log is no longer needed for replay.
    let cleared = ctx.storage.steps.clear_run(run_id)?;
    info!(run_id, cleared, "Workflow run complete");
    Ok(())
}
