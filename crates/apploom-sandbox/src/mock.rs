//! Scriptable in-memory sandbox for tests.
//!
//! Commands are matched by substring against scripted outputs; files live
//! in an in-memory map. Mirrors how the mock LLM client scripts provider
//! responses for loop tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SandboxError};
use crate::{CommandOutput, SandboxGateway, SandboxHandle, https_url};

/// In-memory sandbox with scripted command outputs.
#[derive(Debug, Default)]
pub struct MockSandbox {
    id: String,
    scripted: Mutex<Vec<(String, CommandOutput)>>,
    files: Mutex<BTreeMap<String, String>>,
    commands: Mutex<Vec<String>>,
    fail_writes: Mutex<bool>,
    fail_reads: Mutex<bool>,
    fail_commands: Mutex<bool>,
}

impl MockSandbox {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            ..Default::default()
        })
    }

    /// Script the output returned for any command containing `needle`.
    /// Later scripts win over earlier ones.
    pub fn script_command(&self, needle: impl Into<String>, output: CommandOutput) {
        self.scripted.lock().insert(0, (needle.into(), output));
    }

    pub fn script_stdout(&self, needle: impl Into<String>, stdout: impl Into<String>) {
        self.script_command(
            needle,
            CommandOutput {
                stdout: stdout.into(),
                ..Default::default()
            },
        );
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    pub fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.lock() = fail;
    }

    pub fn set_fail_commands(&self, fail: bool) {
        *self.fail_commands.lock() = fail;
    }

    /// Seed a file as if the sandbox template shipped it.
    pub fn put_file(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files.lock().insert(path.into(), content.into());
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.lock().get(path).cloned()
    }

    /// Every command executed so far, in order.
    pub fn executed_commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl SandboxHandle for MockSandbox {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run_command(&self, command: &str, _timeout: Duration) -> Result<CommandOutput> {
        self.commands.lock().push(command.to_string());

        if *self.fail_commands.lock() {
            return Err(SandboxError::Unavailable("scripted command failure".into()));
        }

        let scripted = self.scripted.lock();
        for (needle, output) in scripted.iter() {
            if command.contains(needle.as_str()) {
                return Ok(output.clone());
            }
        }
        Ok(CommandOutput::default())
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        if *self.fail_writes.lock() {
            return Err(SandboxError::Api {
                status: 500,
                message: "scripted write failure".into(),
            });
        }
        self.files
            .lock()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        if *self.fail_reads.lock() {
            return Err(SandboxError::Api {
                status: 500,
                message: "scripted read failure".into(),
            });
        }
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| SandboxError::Api {
                status: 404,
                message: format!("no such file: {path}"),
            })
    }

    fn public_url(&self, port: u16) -> String {
        https_url(&format!("{}-{}.mock.dev", port, self.id))
    }
}

/// Gateway over a set of mock sandboxes.
#[derive(Default)]
pub struct MockGateway {
    sandboxes: Mutex<HashMap<String, Arc<MockSandbox>>>,
    fail_create: Mutex<bool>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register an existing sandbox so `create` and `reconnect` find it.
    pub fn register(&self, sandbox: Arc<MockSandbox>) {
        self.sandboxes
            .lock()
            .insert(sandbox.id.clone(), sandbox);
    }

    pub fn set_fail_create(&self, fail: bool) {
        *self.fail_create.lock() = fail;
    }
}

#[async_trait]
impl SandboxGateway for MockGateway {
    async fn create(
        &self,
        _template_id: &str,
        _idle_timeout: Duration,
    ) -> Result<Arc<dyn SandboxHandle>> {
        if *self.fail_create.lock() {
            return Err(SandboxError::Unavailable("scripted create failure".into()));
        }

        // Reuse a pre-registered sandbox when there is exactly one, so tests
        // can script it before the workflow runs.
        let mut sandboxes = self.sandboxes.lock();
        if sandboxes.len() == 1
            && let Some(sandbox) = sandboxes.values().next()
        {
            return Ok(sandbox.clone() as Arc<dyn SandboxHandle>);
        }

        let sandbox = MockSandbox::new(format!("sbx-{}", uuid::Uuid::new_v4()));
        sandboxes.insert(sandbox.id.clone(), sandbox.clone());
        Ok(sandbox as Arc<dyn SandboxHandle>)
    }

    async fn reconnect(&self, sandbox_id: &str) -> Result<Arc<dyn SandboxHandle>> {
        self.sandboxes
            .lock()
            .get(sandbox_id)
            .cloned()
            .map(|sandbox| sandbox as Arc<dyn SandboxHandle>)
            .ok_or_else(|| {
                SandboxError::Unavailable(format!(
                    "sandbox {sandbox_id} has expired or been reclaimed"
                ))
            })
    }
}
