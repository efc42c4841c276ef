use async_trait::async_trait;
use content_generator::repair::{FEEDBACK_STATE_KEY, HISTORY_STATE_KEY};
use content_generator::{AttemptHistory, CommandRunner, ContentTools, GeneratorConfig, ToolRun};
use content_generator_agent::{
    ContentGeneratorAgents, GENERATED_CODE_SUMMARY_KEY, LESSON_PLAN_KEY, TEMPLATE_ANALYSIS_KEY,
    VALIDATOR_CALLS_PER_TOOL, build_content_generator,
};
use forge_core::{Agent, Content, Event, IncludeContents, LlmResponse, Part, Result};
use forge_model::MockLlm;
use forge_runner::{Runner, RunnerConfig};
use forge_session::{GetRequest, InMemorySessionService, Session, SessionService};
use futures::StreamExt;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const LESSON: &str = "src/algorithms/11_tries.py";

fn text(t: &str) -> LlmResponse {
    LlmResponse::new(Content::new("model").with_text(t))
}

fn call(name: &str, args: Value) -> LlmResponse {
    LlmResponse::new(Content::new("model").with_part(Part::function_call(name, args)))
}

/// Fails mypy on the first `failing_runs` validations, passes everything else.
struct FlakyMypy {
    failing_runs: usize,
    mypy_runs: AtomicUsize,
}

#[async_trait]
impl CommandRunner for FlakyMypy {
    async fn run(&self, args: &[String], _cwd: &Path, _timeout: Duration) -> ToolRun {
        if args.get(2).map(String::as_str) == Some("mypy") {
            let run = self.mypy_runs.fetch_add(1, Ordering::SeqCst);
            if run < self.failing_runs {
                return ToolRun::new(
                    false,
                    format!("{}:2: error: Missing return statement  [return]\nFound 1 error", LESSON),
                );
            }
        }
        ToolRun::new(true, "OK")
    }
}

struct Fixture {
    _dir: TempDir,
    tools: ContentTools,
    project: std::path::PathBuf,
}

fn fixture(failing_mypy_runs: usize) -> Fixture {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("learning-dsa");
    std::fs::create_dir_all(project.join("src/algorithms")).unwrap();
    std::fs::write(
        project.join("pyproject.toml"),
        "[project]\nname = \"learning-dsa\"\n\n[tool.pytest.ini_options]\naddopts = \"--doctest-modules\"\n",
    )
    .unwrap();
    std::fs::write(project.join("src/algorithms/10_heaps.py"), "\"\"\"Heaps.\"\"\"\n").unwrap();

    let config = GeneratorConfig::default().with_study_base(dir.path()).with_max_repair_cycles(3);
    let runner = Arc::new(FlakyMypy { failing_runs: failing_mypy_runs, mypy_runs: AtomicUsize::new(0) });
    let tools = ContentTools::with_runner(config, runner);
    Fixture { _dir: dir, tools, project }
}

fn agents(model: Arc<MockLlm>, tools: &ContentTools) -> ContentGeneratorAgents {
    build_content_generator(model, tools, 3).unwrap()
}

fn runner(agent: Arc<dyn Agent>, service: Arc<InMemorySessionService>) -> Runner {
    Runner::new(RunnerConfig { app_name: "lesson-forge".to_string(), agent, session_service: service })
        .unwrap()
}

async fn run_on(runner: &Runner, prompt: &str) -> Vec<Result<Event>> {
    runner
        .run("user".to_string(), "s1".to_string(), Content::new("user").with_text(prompt))
        .await
        .unwrap()
        .collect()
        .await
}

async fn run(agent: Arc<dyn Agent>, prompt: &str) -> (Vec<Result<Event>>, Arc<dyn Session>) {
    let service = Arc::new(InMemorySessionService::new());
    let events = run_on(&runner(agent, service.clone()), prompt).await;
    let session = service
        .get(GetRequest {
            app_name: "lesson-forge".to_string(),
            user_id: "user".to_string(),
            session_id: "s1".to_string(),
        })
        .await
        .unwrap();
    (events, session)
}

#[test]
fn test_pipeline_structure() {
    let fixture = fixture(0);
    let agents = agents(Arc::new(MockLlm::new("mock")), &fixture.tools);

    assert_eq!(agents.root.name(), "content_generator");
    let names: Vec<&str> = agents.root.sub_agents().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["template_analyzer", "content_planner", "code_generator", "validation_loop"]);

    assert_eq!(agents.validation_loop.max_iterations(), 4);
    let looped: Vec<&str> = agents.validation_loop.sub_agents().iter().map(|a| a.name()).collect();
    assert_eq!(looped, vec!["validator"]);
}

#[test]
fn test_stage_configuration() {
    let fixture = fixture(0);
    let agents = agents(Arc::new(MockLlm::new("mock")), &fixture.tools);

    let expected = [
        (&agents.template_analyzer, Some(TEMPLATE_ANALYSIS_KEY), IncludeContents::Default, 0.0),
        (&agents.content_planner, Some(LESSON_PLAN_KEY), IncludeContents::None, 0.5),
        (&agents.code_generator, Some(GENERATED_CODE_SUMMARY_KEY), IncludeContents::None, 0.1),
        (&agents.validator, None, IncludeContents::None, 0.0),
    ];
    for (agent, output_key, include, temperature) in expected {
        assert_eq!(agent.output_key(), output_key, "{}", agent.name());
        assert_eq!(agent.include_contents(), include, "{}", agent.name());
        assert_eq!(agent.generate_content_config().unwrap().temperature, Some(temperature));
        assert!(agent.disallow_transfer_to_parent());
        assert!(agent.disallow_transfer_to_peers());
    }
}

#[test]
fn test_stage_tools() {
    let fixture = fixture(0);
    let agents = agents(Arc::new(MockLlm::new("mock")), &fixture.tools);

    assert_eq!(
        agents.template_analyzer.tool_names(),
        vec!["analyze_target_project", "get_existing_content", "read_template", "read_progression_plan"]
    );
    assert_eq!(agents.content_planner.tool_names(), vec!["read_source_reference"]);
    assert_eq!(agents.code_generator.tool_names(), vec!["write_generated_file", "strip_code_fences"]);
    assert_eq!(
        agents.validator.tool_names(),
        vec![
            "run_ruff_format",
            "run_ruff_check",
            "run_mypy_check",
            "run_pytest_doctest",
            "write_generated_file",
            "validate_generated_content",
            "exit_loop",
        ]
    );
}

#[test]
fn test_repair_cycles_bound_the_loop() {
    let fixture = fixture(0);
    let agents = build_content_generator(Arc::new(MockLlm::new("mock")), &fixture.tools, 5).unwrap();
    assert_eq!(agents.validation_loop.max_iterations(), 6);

    let single = build_content_generator(Arc::new(MockLlm::new("mock")), &fixture.tools, 1).unwrap();
    assert_eq!(single.validation_loop.max_iterations(), 2);
}

#[test]
fn test_validator_call_budget_scales_with_tools() {
    let fixture = fixture(0);
    let agents = agents(Arc::new(MockLlm::new("mock")), &fixture.tools);
    let tools = u32::try_from(agents.validator.tool_names().len()).unwrap();
    assert_eq!(agents.validator.max_model_calls(), tools * VALIDATOR_CALLS_PER_TOOL);
    assert!(agents.validator.max_model_calls() > forge_agent::DEFAULT_MAX_MODEL_CALLS);
}

#[tokio::test]
async fn test_pipeline_repairs_then_exits_loop() {
    let fixture = fixture(1);
    let write = |content: &str| {
        call(
            "write_generated_file",
            json!({"project_name": "learning-dsa", "relative_path": LESSON, "content": content}),
        )
    };
    let validate = || {
        call("validate_generated_content", json!({"project_name": "learning-dsa", "relative_path": LESSON}))
    };

    let model = Arc::new(
        MockLlm::new("mock")
            .with_response(call("analyze_target_project", json!({"project_name": "learning-dsa"})))
            .with_response(text("ANALYSIS: learning-dsa, next lesson 11"))
            .with_response(text("PLAN: lesson 11, tries"))
            .with_response(write("```python\ndef insert() -> None:\n    pass\n```"))
            .with_response(text("Wrote src/algorithms/11_tries.py"))
            .with_response(validate())
            .with_response(text("FAIL: mypy reported a missing return"))
            .with_response(write("def insert() -> None:\n    return None\n"))
            .with_response(validate())
            .with_response(call("exit_loop", json!({}))),
    );
    let agents = agents(model.clone(), &fixture.tools);

    let (events, session) = run(agents.root_agent(), "Create lesson 11 about tries for learning-dsa").await;
    for event in &events {
        assert!(event.is_ok(), "{:?}", event);
    }
    assert_eq!(model.remaining(), 0);

    let state = session.state();
    assert_eq!(state.get(TEMPLATE_ANALYSIS_KEY), Some(json!("ANALYSIS: learning-dsa, next lesson 11")));
    assert_eq!(state.get(LESSON_PLAN_KEY), Some(json!("PLAN: lesson 11, tries")));
    assert_eq!(state.get(GENERATED_CODE_SUMMARY_KEY), Some(json!("Wrote src/algorithms/11_tries.py")));
    assert_eq!(state.get("last_written_project"), Some(json!("learning-dsa")));

    let history = AttemptHistory::from_state(state.get(HISTORY_STATE_KEY), 3);
    assert_eq!(history.attempts.len(), 2);
    assert!(!history.attempts[0].passed);
    assert!(history.attempts[1].passed);

    let written = std::fs::read_to_string(fixture.project.join(LESSON)).unwrap();
    assert_eq!(written, "def insert() -> None:\n    return None");

    let requests = model.requests();
    assert_eq!(requests.len(), 10);
    assert_eq!(requests[0].tools.len(), 4);
    assert!(requests[2].system_instruction.as_deref().unwrap().contains("ANALYSIS: learning-dsa"));
    assert!(requests[3].system_instruction.as_deref().unwrap().contains("PLAN: lesson 11, tries"));

    let first_validation = requests[5].system_instruction.as_deref().unwrap();
    assert!(first_validation.contains("Wrote src/algorithms/11_tries.py"));
    assert!(!first_validation.contains("Attempt 1"));

    // second loop iteration sees the feedback recorded by the first
    let second_iteration = requests[7].system_instruction.as_deref().unwrap();
    assert!(second_iteration.contains("Attempt 1 of 4 on src/algorithms/11_tries.py: FAIL"));
    assert!(second_iteration.contains("return Missing return statement"));

    let last = events.last().unwrap().as_ref().unwrap();
    assert!(last.actions.escalate);
    let feedback = state.get(FEEDBACK_STATE_KEY).unwrap();
    assert!(feedback.as_str().unwrap().ends_with("Decision: all checks passed"));
}

fn last_function_response(request: &forge_core::LlmRequest) -> String {
    match &request.contents.last().unwrap().parts[0] {
        Part::FunctionResponse { function_response, .. } => {
            function_response.response.as_str().unwrap_or_default().to_string()
        }
        other => panic!("unexpected part {:?}", other),
    }
}

/// Scripts the three stages before the validation loop.
fn generation_stages(model: MockLlm) -> MockLlm {
    model
        .with_response(text("ANALYSIS"))
        .with_response(text("PLAN"))
        .with_response(call(
            "write_generated_file",
            json!({"project_name": "learning-dsa", "relative_path": LESSON, "content": "x = 1\n"}),
        ))
        .with_response(text("Wrote it"))
}

fn validate() -> LlmResponse {
    call("validate_generated_content", json!({"project_name": "learning-dsa", "relative_path": LESSON}))
}

#[tokio::test]
async fn test_pipeline_gives_up_after_repair_cycles() {
    let fixture = fixture(usize::MAX);
    let mut model = generation_stages(MockLlm::new("mock"));
    for attempt in 1..=4 {
        model = model.with_response(validate()).with_response(text(&format!("FAIL {}", attempt)));
    }
    let model = Arc::new(model);
    let agents = agents(model.clone(), &fixture.tools);

    let (events, session) = run(agents.root_agent(), "Create lesson 11").await;
    assert!(events.iter().all(|e| e.is_ok()));
    assert_eq!(model.remaining(), 0);

    let history = AttemptHistory::from_state(session.state().get(HISTORY_STATE_KEY), 3);
    assert_eq!(history.attempts.len(), 4);
    assert_eq!(history.cycles_used(), 3);
    assert!(history.is_exhausted());

    let requests = model.requests();
    assert!(last_function_response(&requests[5]).ends_with("(cycles remaining: 3)"));
    let last = last_function_response(requests.last().unwrap());
    assert!(last.ends_with("Decision: no repair cycles remaining; report FAIL"));
}

#[tokio::test]
async fn test_second_run_in_same_session_gets_full_cycles() {
    let fixture = fixture(usize::MAX);
    let mut model = generation_stages(MockLlm::new("mock"));
    for attempt in 1..=4 {
        model = model.with_response(validate()).with_response(text(&format!("FAIL {}", attempt)));
    }
    model = generation_stages(model).with_response(validate()).with_response(text("FAIL again"));
    for _ in 0..3 {
        model = model.with_response(text("still failing"));
    }
    let model = Arc::new(model);
    let agents = agents(model.clone(), &fixture.tools);
    let service = Arc::new(InMemorySessionService::new());
    let runner = runner(agents.root_agent(), service);

    let first = run_on(&runner, "Create lesson 11").await;
    assert!(first.iter().all(|e| e.is_ok()));
    let first_requests = model.requests().len();
    assert_eq!(first_requests, 12);

    let second = run_on(&runner, "Create lesson 11 again").await;
    assert!(second.iter().all(|e| e.is_ok()));
    assert_eq!(model.remaining(), 0);

    let requests = model.requests();
    let validator_instruction = requests[first_requests + 4].system_instruction.as_deref().unwrap();
    assert!(!validator_instruction.contains("Attempt"));

    let response = last_function_response(&requests[first_requests + 5]);
    assert!(response.contains("Attempt 1 of 4"));
    assert!(response.ends_with("(cycles remaining: 3)"));
}

#[tokio::test]
async fn test_long_repair_iteration_stays_within_call_budget() {
    let fixture = fixture(2);
    let args = json!({"project_name": "learning-dsa", "relative_path": LESSON});
    let check = |name: &str| call(name, args.clone());
    let rewrite = |content: &str| {
        call(
            "write_generated_file",
            json!({"project_name": "learning-dsa", "relative_path": LESSON, "content": content}),
        )
    };

    let model = Arc::new(
        generation_stages(MockLlm::new("mock"))
            .with_response(check("run_ruff_format"))
            .with_response(check("run_ruff_check"))
            .with_response(check("run_mypy_check"))
            .with_response(check("run_pytest_doctest"))
            .with_response(rewrite("def insert() -> int:\n    return 1\n"))
            .with_response(check("run_mypy_check"))
            .with_response(rewrite("def insert() -> int:\n    return 2\n"))
            .with_response(check("run_mypy_check"))
            .with_response(check("run_ruff_format"))
            .with_response(validate())
            .with_response(call("exit_loop", json!({}))),
    );
    let agents = agents(model.clone(), &fixture.tools);

    let (events, session) = run(agents.root_agent(), "Create lesson 11").await;
    for event in &events {
        assert!(event.is_ok(), "{:?}", event);
    }
    assert_eq!(model.remaining(), 0);
    assert_eq!(model.requests().len() - 4, 11);

    let history = AttemptHistory::from_state(session.state().get(HISTORY_STATE_KEY), 3);
    assert_eq!(history.attempts.len(), 1);
    assert!(history.attempts[0].passed);
    assert!(events.last().unwrap().as_ref().unwrap().actions.escalate);
}
