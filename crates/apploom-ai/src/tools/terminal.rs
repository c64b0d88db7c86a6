//! Terminal tool: run shell commands inside the generation sandbox.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use apploom_sandbox::SandboxHandle;
use apploom_storage::StepRunner;
use apploom_traits::{Result, Tool, ToolError, ToolOutput};

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs a shell command in the sandbox and returns captured stdout.
///
/// Each invocation is a durable step, so a resumed run replays recorded
/// output instead of re-executing the command.
pub struct TerminalTool {
    sandbox: Arc<dyn SandboxHandle>,
    steps: StepRunner,
    timeout: Duration,
}

impl TerminalTool {
    pub fn new(sandbox: Arc<dyn SandboxHandle>, steps: StepRunner) -> Self {
        Self {
            sandbox,
            steps,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct TerminalInput {
    command: String,
}

#[async_trait]
impl Tool for TerminalTool {
    fn name(&self) -> &str {
        "terminal"
    }

    fn description(&self) -> &str {
        "Run a shell command in the sandbox and return its stdout"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "Shell command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let input: TerminalInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let stdout: Option<String> = self
            .steps
            .run_indexed("terminal", async {
                match self.sandbox.run_command(&input.command, self.timeout).await {
                    Ok(output) => {
                        if output.exit_code != 0 && !output.stderr.is_empty() {
                            tracing::debug!(
                                command = %input.command,
                                exit_code = output.exit_code,
                                stderr = %output.stderr,
                                "Command exited non-zero"
                            );
                        }
                        Ok(Some(output.stdout))
                    }
                    Err(e) => {
                        // Failures surface to the agent as absent output, not
                        // as a raised error, so the loop can keep going.
                        tracing::error!(
                            command = %input.command,
                            error = %e,
                            "Command execution failed"
                        );
                        Ok(None)
                    }
                }
            })
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(match stdout {
            Some(stdout) => ToolOutput::success(Value::String(stdout)),
            None => ToolOutput::success(Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apploom_sandbox::MockSandbox;
    use apploom_storage::StepLogStorage;
    use redb::Database;

    fn steps() -> (StepRunner, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let log = StepLogStorage::new(db).unwrap();
        (StepRunner::new(log, "run-1"), temp_dir)
    }

    #[tokio::test]
    async fn returns_captured_stdout() {
        let sandbox = MockSandbox::new("sb-1");
        sandbox.script_stdout("npm install", "added 12 packages");
        let (runner, _dir) = steps();

        let tool = TerminalTool::new(sandbox, runner);
        let output = tool
            .execute(json!({"command": "npm install lodash"}))
            .await
            .unwrap();

        assert!(output.success);
        assert_eq!(output.as_llm_content(), "added 12 packages");
    }

    #[tokio::test]
    async fn execution_failure_yields_empty_output() {
        let sandbox = MockSandbox::new("sb-1");
        sandbox.set_fail_commands(true);
        let (runner, _dir) = steps();

        let tool = TerminalTool::new(sandbox, runner);
        let output = tool.execute(json!({"command": "ls"})).await.unwrap();

        assert!(output.success);
        assert_eq!(output.as_llm_content(), "");
    }

    #[tokio::test]
    async fn missing_command_is_invalid_input() {
        let sandbox = MockSandbox::new("sb-1");
        let (runner, _dir) = steps();

        let tool = TerminalTool::new(sandbox, runner);
        assert!(tool.execute(json!({})).await.is_err());
    }
}
