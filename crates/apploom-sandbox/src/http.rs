//! HTTP client for the remote sandbox control plane.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SandboxError};
use crate::{CommandOutput, SandboxGateway, SandboxHandle, https_url};

/// Extra slack on top of the remote command timeout so the server-side
/// limit fires before the client aborts the request.
const CLIENT_TIMEOUT_SLACK: Duration = Duration::from_secs(5);

/// Gateway talking to a sandbox control-plane API over HTTP.
pub struct HttpSandboxGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpSandboxGateway {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn handle(&self, info: SandboxInfo) -> Arc<dyn SandboxHandle> {
        Arc::new(HttpSandboxHandle {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            sandbox_id: info.sandbox_id,
            domain: info.domain,
        })
    }

    async fn api_error(response: reqwest::Response) -> SandboxError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        SandboxError::Api { status, message }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSandboxRequest<'a> {
    template_id: &'a str,
    timeout_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SandboxInfo {
    sandbox_id: String,
    /// Base domain for public URLs, e.g. `sbx-abc123.apploom.dev`.
    domain: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecRequest<'a> {
    command: &'a str,
    timeout_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecResponse {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    exit_code: i32,
}

#[derive(Serialize)]
struct WriteFileRequest<'a> {
    path: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ReadFileResponse {
    content: String,
}

#[async_trait]
impl SandboxGateway for HttpSandboxGateway {
    async fn create(
        &self,
        template_id: &str,
        idle_timeout: Duration,
    ) -> Result<Arc<dyn SandboxHandle>> {
        let response = self
            .client
            .post(format!("{}/sandboxes", self.base_url))
            .header("X-API-Key", &self.api_key)
            .json(&CreateSandboxRequest {
                template_id,
                timeout_ms: idle_timeout.as_millis() as u64,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let info: SandboxInfo = response.json().await?;
        tracing::info!(sandbox_id = %info.sandbox_id, template_id, "Created sandbox");
        Ok(self.handle(info))
    }

    async fn reconnect(&self, sandbox_id: &str) -> Result<Arc<dyn SandboxHandle>> {
        let response = self
            .client
            .get(format!("{}/sandboxes/{}", self.base_url, sandbox_id))
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND || response.status() == StatusCode::GONE {
            return Err(SandboxError::Unavailable(format!(
                "sandbox {sandbox_id} has expired or been reclaimed"
            )));
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let info: SandboxInfo = response.json().await?;
        Ok(self.handle(info))
    }
}

#[derive(Debug)]
struct HttpSandboxHandle {
    client: Client,
    base_url: String,
    api_key: String,
    sandbox_id: String,
    domain: String,
}

#[async_trait]
impl SandboxHandle for HttpSandboxHandle {
    fn id(&self) -> &str {
        &self.sandbox_id
    }

    async fn run_command(&self, command: &str, timeout: Duration) -> Result<CommandOutput> {
        let response = self
            .client
            .post(format!(
                "{}/sandboxes/{}/exec",
                self.base_url, self.sandbox_id
            ))
            .header("X-API-Key", &self.api_key)
            .timeout(timeout + CLIENT_TIMEOUT_SLACK)
            .json(&ExecRequest {
                command,
                timeout_ms: timeout.as_millis() as u64,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HttpSandboxGateway::api_error(response).await);
        }

        let exec: ExecResponse = response.json().await?;
        Ok(CommandOutput {
            stdout: exec.stdout,
            stderr: exec.stderr,
            exit_code: exec.exit_code,
        })
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let response = self
            .client
            .put(format!(
                "{}/sandboxes/{}/files",
                self.base_url, self.sandbox_id
            ))
            .header("X-API-Key", &self.api_key)
            .json(&WriteFileRequest { path, content })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HttpSandboxGateway::api_error(response).await);
        }
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        let response = self
            .client
            .get(format!(
                "{}/sandboxes/{}/files",
                self.base_url, self.sandbox_id
            ))
            .header("X-API-Key", &self.api_key)
            .query(&[("path", path)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HttpSandboxGateway::api_error(response).await);
        }

        let file: ReadFileResponse = response.json().await?;
        Ok(file.content)
    }

    fn public_url(&self, port: u16) -> String {
        https_url(&format!("{}-{}", port, self.domain))
    }
}
