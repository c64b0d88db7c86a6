//! Status-check workflow: reconnect to a fragment's sandbox and report
//! liveness plus recent dev-server logs.

use anyhow::{Result, bail};
use tracing::info;

use crate::health::{DEV_SERVER_LOG_PATH, prepare_log_for_display, probe};
use crate::workflow::WorkflowContext;

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub running: bool,
    pub url: String,
    pub log: String,
}

pub async fn run_status(ctx: &WorkflowContext, fragment_id: &str) -> Result<StatusReport> {
    let Some(fragment) = ctx.storage.fragments.get(fragment_id)? else {
        bail!("Fragment not found: {fragment_id}");
    };

    let sandbox = ctx.gateway.reconnect(&fragment.sandbox_id).await?;

    let running = probe(&sandbox).await;

    // A missing log file is normal when the server never started.
    let log = sandbox
        .read_file(DEV_SERVER_LOG_PATH)
        .await
        .unwrap_or_default();

    info!(
        fragment_id,
        sandbox_id = fragment.sandbox_id,
        running,
        "Status check complete"
    );

    Ok(StatusReport {
        running,
        url: sandbox.public_url(ctx.config.app_port),
        log: prepare_log_for_display(&log),
    })
}
