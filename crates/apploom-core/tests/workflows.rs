//! End-to-end workflow tests over mock LLM clients and a mock sandbox
//! gateway, with real redb-backed storage.

use std::sync::Arc;

use apploom_ai::llm::{LlmClient, MockLlmClient, MockStep, ModelFactory};
use apploom_core::config::CoreConfig;
use apploom_core::workflow::{
    PlanOutcome, WorkflowContext, run_generate, run_plan, run_status,
};
use apploom_sandbox::{MockGateway, MockSandbox, SandboxGateway};
use apploom_storage::{
    MasterKey, MessageKind, ProjectRecord, StepRunner, Storage,
};
use apploom_traits::{AgentPurpose, ProviderId};
use serde_json::json;

/// Scripted clients per agent purpose.
#[derive(Default)]
struct ScriptedModels {
    code: MockLlmClient,
    title: MockLlmClient,
    response: MockLlmClient,
}

impl ScriptedModels {
    fn new(code: Vec<MockStep>, title: Vec<MockStep>, response: Vec<MockStep>) -> Self {
        Self {
            code: MockLlmClient::from_steps("mock-code", code),
            title: MockLlmClient::from_steps("mock-title", title),
            response: MockLlmClient::from_steps("mock-response", response),
        }
    }
}

impl ModelFactory for ScriptedModels {
    fn client(
        &self,
        _provider: ProviderId,
        _api_key: &str,
        purpose: AgentPurpose,
    ) -> apploom_ai::Result<Arc<dyn LlmClient>> {
        Ok(Arc::new(match purpose {
            AgentPurpose::Code => self.code.clone(),
            AgentPurpose::Title => self.title.clone(),
            AgentPurpose::Response => self.response.clone(),
        }))
    }
}

struct Harness {
    ctx: WorkflowContext,
    project_id: String,
    sandbox: Arc<MockSandbox>,
    _dir: tempfile::TempDir,
}

/// Build a context with one project, one registered sandbox and, unless
/// `with_key` is false, one stored Gemini API key for the project's user.
fn harness(models: ScriptedModels, with_key: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(Storage::new(dir.path().join("test.db")).unwrap());
    let master_key = MasterKey::from_bytes(&[7u8; 32]).unwrap();
    let vault = Arc::new(storage.vault(&master_key).unwrap());

    let project = ProjectRecord::new("user-1", "demo");
    storage.projects.upsert(&project).unwrap();

    if with_key {
        vault
            .store_api_key("user-1", ProviderId::Gemini, "sk-test-1234")
            .unwrap();
    }

    let sandbox = MockSandbox::new("sb-test");
    sandbox.script_stdout("curl", "200");
    let gateway = MockGateway::new();
    gateway.register(sandbox.clone());

    let ctx = WorkflowContext {
        storage,
        vault,
        gateway: gateway as Arc<dyn SandboxGateway>,
        models: Arc::new(models),
        config: CoreConfig::default(),
    };

    Harness {
        ctx,
        project_id: project.id,
        sandbox,
        _dir: dir,
    }
}

fn steps(ctx: &WorkflowContext, run_id: &str) -> StepRunner {
    StepRunner::new(ctx.storage.steps.clone(), run_id)
}

#[tokio::test]
async fn plan_without_credentials_persists_one_error_and_no_plan() {
    let h = harness(ScriptedModels::default(), false);
    let runner = steps(&h.ctx, "run-1");

    let outcome = run_plan(&h.ctx, &runner, &h.project_id, "build a todo app")
        .await
        .unwrap();
    assert!(matches!(outcome, PlanOutcome::MissingApiKey));

    let messages = h.ctx.storage.messages.list(&h.project_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].kind, MessageKind::Error));
    assert!(messages[0].content.contains("No API key configured"));
}

#[tokio::test]
async fn plan_saves_a_plan_message() {
    let models = ScriptedModels::new(
        vec![MockStep::text("1. Create the page\n2. Style it")],
        vec![],
        vec![],
    );
    let h = harness(models, true);
    let runner = steps(&h.ctx, "run-1");

    let outcome = run_plan(&h.ctx, &runner, &h.project_id, "build a todo app")
        .await
        .unwrap();
    match outcome {
        PlanOutcome::Planned { plan } => assert!(plan.contains("Create the page")),
        PlanOutcome::MissingApiKey => panic!("expected a plan"),
    }

    let messages = h.ctx.storage.messages.list(&h.project_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].kind, MessageKind::Plan));
}

#[tokio::test]
async fn plan_falls_back_when_the_agent_returns_nothing() {
    // A scripted LLM error inside the single-iteration network would fail
    // the run; blank text instead yields the fixed fallback plan.
    let models = ScriptedModels::new(vec![MockStep::text("")], vec![], vec![]);
    let h = harness(models, true);
    let runner = steps(&h.ctx, "run-1");

    let outcome = run_plan(&h.ctx, &runner, &h.project_id, "build").await.unwrap();
    match outcome {
        PlanOutcome::Planned { plan } => assert_eq!(plan, "Failed to generate plan."),
        PlanOutcome::MissingApiKey => panic!("expected a plan"),
    }
}

#[tokio::test]
async fn replayed_plan_run_does_not_duplicate_the_error_message() {
    let h = harness(ScriptedModels::default(), false);

    run_plan(&h.ctx, &steps(&h.ctx, "run-1"), &h.project_id, "build")
        .await
        .unwrap();
    // Crash-and-resume: same run id, step already recorded.
    run_plan(&h.ctx, &steps(&h.ctx, "run-1"), &h.project_id, "build")
        .await
        .unwrap();

    let messages = h.ctx.storage.messages.list(&h.project_id).unwrap();
    assert_eq!(messages.len(), 1);
}

#[tokio::test]
async fn generate_without_files_persists_generic_error_and_no_fragment() {
    // The agent "finishes" without ever writing a file.
    let models = ScriptedModels::new(
        vec![MockStep::text("<task_summary>did nothing</task_summary>")],
        vec![MockStep::text("Empty Run")],
        vec![MockStep::text("All done!")],
    );
    let h = harness(models, true);
    let runner = steps(&h.ctx, "run-1");

    run_generate(&h.ctx, &runner, &h.project_id, "build a todo app")
        .await
        .unwrap();

    let messages = h.ctx.storage.messages.list(&h.project_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].kind, MessageKind::Error));
    assert_eq!(messages[0].content, "Something went wrong. Please try again.");
    assert_eq!(h.ctx.storage.fragments.count().unwrap(), 0);
}

#[tokio::test]
async fn successful_generation_creates_one_result_with_one_fragment() {
    let models = ScriptedModels::new(
        vec![
            MockStep::tool_call(
                "call-1",
                "createOrUpdateFiles",
                json!({"files": [{"path": "app/page.tsx", "content": "export default Page"}]}),
            ),
            MockStep::text("<task_summary>Built a landing page.</task_summary>"),
        ],
        vec![MockStep::text("Landing Page")],
        vec![MockStep::text("Your landing page is ready!")],
    );
    let h = harness(models, true);
    let runner = steps(&h.ctx, "run-1");

    run_generate(&h.ctx, &runner, &h.project_id, "build a landing page")
        .await
        .unwrap();

    let messages = h.ctx.storage.messages.list(&h.project_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].kind, MessageKind::Result));
    assert_eq!(messages[0].content, "Your landing page is ready!");

    let fragments = h
        .ctx
        .storage
        .fragments
        .find_by_message(&messages[0].id)
        .unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].sandbox_id, "sb-test");
    assert_eq!(fragments[0].title, "Landing Page");
    assert_eq!(fragments[0].sandbox_url, "https://3000-sb-test.mock.dev");
    assert!(fragments[0].files.contains_key("app/page.tsx"));

    // The tool actually wrote the file into the sandbox.
    assert_eq!(
        h.sandbox.file("app/page.tsx").as_deref(),
        Some("export default Page")
    );
}

#[tokio::test]
async fn generate_without_credentials_short_circuits_with_an_error_message() {
    let h = harness(ScriptedModels::default(), false);
    let runner = steps(&h.ctx, "run-1");

    run_generate(&h.ctx, &runner, &h.project_id, "build")
        .await
        .unwrap();

    let messages = h.ctx.storage.messages.list(&h.project_id).unwrap();
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].kind, MessageKind::Error));
    // No sandbox was created for a run that never started.
    assert!(h.sandbox.executed_commands().is_empty());
}

#[tokio::test]
async fn status_check_reports_liveness_and_annotated_log() {
    let models = ScriptedModels::new(
        vec![
            MockStep::tool_call(
                "call-1",
                "createOrUpdateFiles",
                json!({"files": [{"path": "app/page.tsx", "content": "x"}]}),
            ),
            MockStep::text("<task_summary>done</task_summary>"),
        ],
        vec![MockStep::text("Page")],
        vec![MockStep::text("Done!")],
    );
    let h = harness(models, true);
    run_generate(&h.ctx, &steps(&h.ctx, "run-1"), &h.project_id, "build")
        .await
        .unwrap();

    let messages = h.ctx.storage.messages.list(&h.project_id).unwrap();
    let fragment = &h
        .ctx
        .storage
        .fragments
        .find_by_message(&messages[0].id)
        .unwrap()[0];

    h.sandbox
        .put_file("/tmp/nextjs.log", "Error: Hydration failed in app/page.tsx");
    h.sandbox.script_stdout("curl", "000");

    let report = run_status(&h.ctx, &fragment.id).await.unwrap();
    assert!(!report.running);
    assert_eq!(report.url, "https://3000-sb-test.mock.dev");
    assert!(report.log.contains("Hydration failed"));
    assert!(report.log.contains("hydration mismatch"));
}

#[tokio::test]
async fn status_check_fails_for_unknown_fragments() {
    let h = harness(ScriptedModels::default(), true);
    assert!(run_status(&h.ctx, "no-such-fragment").await.is_err());
}
