//! Apploom Sandbox - gateway to a remote, stateful execution environment.
//!
//! The gateway exposes command execution and file read/write against a
//! sandbox identified by a stable `sandbox_id`, so later workflow runs
//! (status checks, fix requests) can reconnect to the same environment.

pub mod error;
pub mod http;
pub mod mock;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use error::{Result, SandboxError};
pub use http::HttpSandboxGateway;
pub use mock::{MockGateway, MockSandbox};

/// Captured output of one command execution.
///
/// A non-zero exit code is not an error at this layer: callers inspect the
/// output (liveness probes read stdout, not exit codes).
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// A live connection to one remote sandbox.
#[async_trait]
pub trait SandboxHandle: Send + Sync + std::fmt::Debug {
    /// Stable identifier usable with [`SandboxGateway::reconnect`].
    fn id(&self) -> &str;

    /// Run a shell command, capturing stdout/stderr. Does not fail on
    /// non-zero exit; fails only when the execution itself cannot happen.
    async fn run_command(&self, command: &str, timeout: Duration) -> Result<CommandOutput>;

    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    async fn read_file(&self, path: &str) -> Result<String>;

    /// Public URL for a port served inside the sandbox, always https.
    fn public_url(&self, port: u16) -> String;
}

/// Factory for sandbox handles.
#[async_trait]
pub trait SandboxGateway: Send + Sync {
    /// Create a fresh sandbox from a template with the given idle timeout.
    async fn create(
        &self,
        template_id: &str,
        idle_timeout: Duration,
    ) -> Result<Arc<dyn SandboxHandle>>;

    /// Reconnect to an existing sandbox by id. Fails with
    /// [`SandboxError::Unavailable`] when the environment has been reclaimed.
    async fn reconnect(&self, sandbox_id: &str) -> Result<Arc<dyn SandboxHandle>>;
}

/// Strip any scheme and re-normalize to https.
pub(crate) fn https_url(host: &str) -> String {
    let host = host
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    format!("https://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_url_normalizes_schemes() {
        assert_eq!(https_url("http://3000-sb.dev"), "https://3000-sb.dev");
        assert_eq!(https_url("https://3000-sb.dev"), "https://3000-sb.dev");
        assert_eq!(https_url("3000-sb.dev"), "https://3000-sb.dev");
    }
}
