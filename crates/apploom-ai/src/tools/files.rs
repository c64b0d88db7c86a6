//! File tools: write and read sandbox files, keeping the shared state's
//! `files` map in sync with what has been written.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use apploom_sandbox::SandboxHandle;
use apploom_storage::StepRunner;
use apploom_traits::{Result, Tool, ToolError, ToolOutput};

use crate::agent::state::SharedState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

/// Writes files into the sandbox and merges them into the shared `files` map.
///
/// The merge is a read-modify-write against the live state, so a second call
/// in the same iteration sees the first call's entries. A failed call leaves
/// the map untouched.
pub struct CreateOrUpdateFilesTool {
    sandbox: Arc<dyn SandboxHandle>,
    state: SharedState,
    steps: StepRunner,
}

impl CreateOrUpdateFilesTool {
    pub fn new(sandbox: Arc<dyn SandboxHandle>, state: SharedState, steps: StepRunner) -> Self {
        Self {
            sandbox,
            state,
            steps,
        }
    }
}

#[derive(Deserialize)]
struct CreateOrUpdateInput {
    files: Vec<FileEntry>,
}

#[async_trait]
impl Tool for CreateOrUpdateFilesTool {
    fn name(&self) -> &str {
        "createOrUpdateFiles"
    }

    fn description(&self) -> &str {
        "Create or update files in the sandbox"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "path": { "type": "string" },
                            "content": { "type": "string" }
                        },
                        "required": ["path", "content"]
                    }
                }
            },
            "required": ["files"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let input: CreateOrUpdateInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        // The sandbox writes are the replayable side effect; the state merge
        // below re-applies on replay so the in-memory map stays consistent.
        let written: std::result::Result<Vec<FileEntry>, String> = self
            .steps
            .run_indexed("create-or-update-files", async {
                for entry in &input.files {
                    if let Err(e) = self.sandbox.write_file(&entry.path, &entry.content).await {
                        tracing::error!(path = %entry.path, error = %e, "File write failed");
                        return Ok(Err(e.to_string()));
                    }
                }
                Ok(Ok(input.files.clone()))
            })
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        match written {
            Ok(entries) => {
                let mut state = self.state.lock().await;
                for entry in entries {
                    state.files.insert(entry.path, entry.content);
                }
                let files = serde_json::to_value(&state.files)?;
                Ok(ToolOutput::success(files))
            }
            Err(message) => Ok(ToolOutput::error(message)),
        }
    }
}

/// Reads files from the sandbox, all-or-nothing.
pub struct ReadFilesTool {
    sandbox: Arc<dyn SandboxHandle>,
    steps: StepRunner,
}

impl ReadFilesTool {
    pub fn new(sandbox: Arc<dyn SandboxHandle>, steps: StepRunner) -> Self {
        Self { sandbox, steps }
    }
}

#[derive(Deserialize)]
struct ReadFilesInput {
    files: Vec<String>,
}

#[async_trait]
impl Tool for ReadFilesTool {
    fn name(&self) -> &str {
        "readFiles"
    }

    fn description(&self) -> &str {
        "Read files from the sandbox"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "files": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Paths to read"
                }
            },
            "required": ["files"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let input: ReadFilesInput =
            serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

        let contents: std::result::Result<Vec<FileEntry>, String> = self
            .steps
            .run_indexed("read-files", async {
                let mut entries = Vec::with_capacity(input.files.len());
                for path in &input.files {
                    match self.sandbox.read_file(path).await {
                        Ok(content) => entries.push(FileEntry {
                            path: path.clone(),
                            content,
                        }),
                        // One bad path fails the whole call rather than
                        // returning partial results.
                        Err(e) => return Ok(Err(e.to_string())),
                    }
                }
                Ok(Ok(entries))
            })
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        match contents {
            Ok(entries) => {
                let serialized = serde_json::to_string(&entries)?;
                Ok(ToolOutput::success(Value::String(serialized)))
            }
            Err(message) => Ok(ToolOutput::error(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::state::shared_state;
    use apploom_sandbox::MockSandbox;
    use apploom_storage::StepLogStorage;
    use redb::Database;

    fn steps(run_id: &str) -> (StepRunner, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let log = StepLogStorage::new(db).unwrap();
        (StepRunner::new(log, run_id), temp_dir)
    }

    #[tokio::test]
    async fn writes_merge_into_shared_state() {
        let sandbox = MockSandbox::new("sb-1");
        let state = shared_state();
        let (runner, _dir) = steps("run-1");
        let tool = CreateOrUpdateFilesTool::new(sandbox.clone(), state.clone(), runner);

        tool.execute(json!({"files": [{"path": "app/page.tsx", "content": "one"}]}))
            .await
            .unwrap();
        tool.execute(json!({"files": [{"path": "app/layout.tsx", "content": "two"}]}))
            .await
            .unwrap();

        let files = state.lock().await.files.clone();
        assert_eq!(files.len(), 2);
        assert_eq!(files["app/page.tsx"], "one");
        assert_eq!(sandbox.file("app/layout.tsx").as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn rewriting_the_same_path_keeps_one_entry() {
        let sandbox = MockSandbox::new("sb-1");
        let state = shared_state();
        let (runner, _dir) = steps("run-1");
        let tool = CreateOrUpdateFilesTool::new(sandbox, state.clone(), runner);

        let input = json!({"files": [{"path": "app/page.tsx", "content": "same"}]});
        tool.execute(input.clone()).await.unwrap();
        tool.execute(input).await.unwrap();

        let files = state.lock().await.files.clone();
        assert_eq!(files.len(), 1);
        assert_eq!(files["app/page.tsx"], "same");
    }

    #[tokio::test]
    async fn failed_write_reports_error_and_preserves_state() {
        let sandbox = MockSandbox::new("sb-1");
        let state = shared_state();
        state
            .lock()
            .await
            .files
            .insert("app/existing.tsx".to_string(), "kept".to_string());
        sandbox.set_fail_writes(true);
        let (runner, _dir) = steps("run-1");
        let tool = CreateOrUpdateFilesTool::new(sandbox, state.clone(), runner);

        let output = tool
            .execute(json!({"files": [{"path": "app/new.tsx", "content": "x"}]}))
            .await
            .unwrap();

        assert!(!output.success);
        assert!(output.as_llm_content().starts_with("Error: "));
        let files = state.lock().await.files.clone();
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("app/existing.tsx"));
    }

    #[tokio::test]
    async fn read_files_returns_serialized_entries() {
        let sandbox = MockSandbox::new("sb-1");
        sandbox.put_file("app/page.tsx", "export default Page");
        let (runner, _dir) = steps("run-1");
        let tool = ReadFilesTool::new(sandbox, runner);

        let output = tool
            .execute(json!({"files": ["app/page.tsx"]}))
            .await
            .unwrap();

        assert!(output.success);
        let content = output.as_llm_content();
        let entries: Vec<FileEntry> = serde_json::from_str(&content).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "app/page.tsx");
    }

    #[tokio::test]
    async fn one_missing_path_fails_the_whole_read() {
        let sandbox = MockSandbox::new("sb-1");
        sandbox.put_file("app/page.tsx", "content");
        let (runner, _dir) = steps("run-1");
        let tool = ReadFilesTool::new(sandbox, runner);

        let output = tool
            .execute(json!({"files": ["app/page.tsx", "missing.txt"]}))
            .await
            .unwrap();

        assert!(!output.success);
    }

    #[tokio::test]
    async fn replayed_writes_do_not_touch_the_sandbox_again() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let log = StepLogStorage::new(db).unwrap();

        let sandbox = MockSandbox::new("sb-1");
        let state = shared_state();
        let input = json!({"files": [{"path": "app/page.tsx", "content": "v1"}]});

        let tool = CreateOrUpdateFilesTool::new(
            sandbox.clone(),
            state.clone(),
            StepRunner::new(log.clone(), "run-1"),
        );
        tool.execute(input.clone()).await.unwrap();

        // Resume the run: the sandbox "loses" the file, but the recorded step
        // replays and still repopulates the state map.
        let resumed_sandbox = MockSandbox::new("sb-1");
        resumed_sandbox.set_fail_writes(true);
        let resumed_state = shared_state();
        let resumed = CreateOrUpdateFilesTool::new(
            resumed_sandbox,
            resumed_state.clone(),
            StepRunner::new(log, "run-1"),
        );
        let output = resumed.execute(input).await.unwrap();

        assert!(output.success);
        assert_eq!(resumed_state.lock().await.files["app/page.tsx"], "v1");
    }
}
