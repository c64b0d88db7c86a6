//! Durable code-agent workflows.
//!
//! Each workflow is a fixed sequence of named steps over a [`StepRunner`]:
//! side-effectful steps (sandbox creation, message persistence, LLM calls)
//! are memoized per run id, so a resumed run replays completed steps instead
//! of repeating their effects. Read-only lookups run directly.

pub mod event;
pub mod generate;
pub mod plan;
pub mod status;

pub use event::{CodeAgentEvent, EventDispatcher};
pub use generate::{GenerateOutcome, run_generate};
pub use plan::{PlanOutcome, run_plan};
pub use status::{StatusReport, run_status};

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use apploom_ai::llm::{Message, ModelFactory};
use apploom_sandbox::SandboxGateway;
use apploom_storage::{CredentialVault, MessageRole, ProjectRecord, Storage, VaultError};
use apploom_traits::ProviderId;

use crate::config::CoreConfig;

/// Everything a workflow run needs, shared across runs.
pub struct WorkflowContext {
    pub storage: Arc<Storage>,
    pub vault: Arc<CredentialVault>,
    pub gateway: Arc<dyn SandboxGateway>,
    pub models: Arc<dyn ModelFactory>,
    pub config: CoreConfig,
}

/// Outcome of credential resolution at workflow start.
pub enum CredentialOutcome {
    Resolved { provider: ProviderId, api_key: String },
    /// No key configured: the user-visible message to persist.
    Missing { message: String },
}

impl WorkflowContext {
    pub(crate) fn find_project(&self, project_id: &str) -> Result<ProjectRecord> {
        match self.storage.projects.get(project_id)? {
            Some(project) => Ok(project),
            None => bail!("Project not found: {project_id}"),
        }
    }

    /// Resolve the user's default-provider key. MissingCredential is an
    /// expected branch; everything else is a hard failure of the run.
    pub(crate) fn resolve_credentials(&self, user_id: &str) -> Result<CredentialOutcome> {
        match self.vault.resolve_api_key(user_id) {
            Ok(credential) => Ok(CredentialOutcome::Resolved {
                provider: credential.provider,
                api_key: credential.api_key,
            }),
            Err(err @ VaultError::MissingCredential { .. }) => Ok(CredentialOutcome::Missing {
                message: err.to_string(),
            }),
            Err(err) => Err(anyhow::Error::new(err)).context("Credential resolution failed"),
        }
    }

    /// Load the last `limit` non-empty conversation turns, oldest first,
    /// as chat messages.
    pub(crate) fn conversation_history(
        &self,
        project_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let records = self.storage.messages.find_recent(project_id, limit)?;
        Ok(records
            .into_iter()
            .filter(|record| !record.content.is_empty())
            .map(|record| match record.role {
                MessageRole::Assistant => Message::assistant(record.content),
                MessageRole::User => Message::user(record.content),
            })
            .collect())
    }
}
