use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use apploom_ai::llm::ProviderRegistry;
use apploom_core::config::CoreConfig;
use apploom_core::server::{AppState, router};
use apploom_core::workflow::{EventDispatcher, WorkflowContext};
use apploom_sandbox::HttpSandboxGateway;
use apploom_storage::{MasterKey, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CoreConfig::from_env();
    let master_key = MasterKey::from_env().context("Master key required")?;

    let storage = Arc::new(Storage::new(&config.db_path)?);
    let vault = Arc::new(storage.vault(&master_key)?);
    let gateway = Arc::new(HttpSandboxGateway::new(
        config.sandbox_api_url.clone(),
        config.sandbox_api_key.clone(),
    ));

    let ctx = Arc::new(WorkflowContext {
        storage,
        vault,
        gateway,
        models: Arc::new(ProviderRegistry::new()),
        config: config.clone(),
    });

    let dispatcher = EventDispatcher::spawn(ctx.clone());
    let app = router(AppState { ctx, dispatcher });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Apploom orchestrator listening");

    axum::serve(listener, app).await?;
    Ok(())
}
