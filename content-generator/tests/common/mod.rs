#![allow(dead_code)]

use async_trait::async_trait;
use content_generator::{CommandRunner, GeneratorConfig, ToolRun, ValidationTool};
use forge_core::{Content, EventActions, ReadonlyContext, State, ToolContext};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const DSA_PYPROJECT: &str = r#"[project]
name = "learning-dsa"
requires-python = ">=3.12"

[tool.pytest.ini_options]
addopts = "-v --doctest-modules"

[tool.mypy]
strict = true

[tool.ruff]
target-version = "py312"
"#;

pub const FASTAPI_PYPROJECT: &str = r#"[project]
dependencies = ["fastapi"]

[tool.pytest]
addopts = ["-q"]
"#;

/// A study base holding `learning-dsa` and `learning-fastapi`.
pub struct StudyFixture {
    pub dir: TempDir,
}

impl StudyFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let fixture = Self { dir };

        let dsa = fixture.project("learning-dsa");
        write(&dsa.join("pyproject.toml"), DSA_PYPROJECT);
        write(&dsa.join("AGENTS.md"), "Use NumPy docstrings.\n");
        write(&dsa.join("src/__init__.py"), "");
        write(&dsa.join("src/algorithms/__init__.py"), "");
        write(&dsa.join("src/algorithms/01_arrays.py"), "\"\"\"Arrays.\"\"\"\n");
        write(&dsa.join("src/algorithms/02_linked_lists.py"), "\"\"\"Linked lists.\"\"\"\n");
        write(&dsa.join("src/algorithms/10_heaps.py"), "\"\"\"Heaps.\"\"\"\n");
        write(&dsa.join("notes/lesson_template.py"), "# lesson template\n");
        write(&dsa.join("notes/progression.md"), "1. arrays\n2. lists");
        write(&dsa.join("notes/progression_extra.txt"), "bonus: tries");
        write(&dsa.join("notes/other.md"), "not a plan");

        let fastapi = fixture.project("learning-fastapi");
        write(&fastapi.join("pyproject.toml"), FASTAPI_PYPROJECT);
        write(&fastapi.join("app/__init__.py"), "");
        write(&fastapi.join("app/main.py"), "app = None\n");
        write(&fastapi.join("src/helpers.py"), "def helper() -> None: ...\n");

        fixture
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn project(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self) -> GeneratorConfig {
        GeneratorConfig::default().with_study_base(self.base())
    }
}

pub fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Answers each validation command from a script; unscripted checks pass.
#[derive(Default)]
pub struct ScriptedRunner {
    failures: Mutex<HashMap<ValidationTool, Vec<String>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a failing output for the next run of `tool`.
    pub fn fail(self, tool: ValidationTool, output: &str) -> Self {
        self.failures.lock().unwrap().entry(tool).or_default().push(output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, args: &[String], _cwd: &Path, _timeout: Duration) -> ToolRun {
        self.calls.lock().unwrap().push(args.to_vec());
        let file = Path::new(args.last().map(String::as_str).unwrap_or_default());
        let tool = ValidationTool::ALL.into_iter().find(|t| t.args(file) == args);

        let queued = tool.and_then(|t| {
            let mut failures = self.failures.lock().unwrap();
            let outputs = failures.get_mut(&t)?;
            if outputs.is_empty() { None } else { Some(outputs.remove(0)) }
        });

        match queued {
            Some(output) => ToolRun::new(false, output),
            None => ToolRun::new(true, "OK"),
        }
    }
}

pub struct MapState(pub Mutex<HashMap<String, Value>>);

impl State for MapState {
    fn get(&self, key: &str) -> Option<Value> {
        self.0.lock().unwrap().get(key).cloned()
    }
    fn all(&self) -> HashMap<String, Value> {
        self.0.lock().unwrap().clone()
    }
}

/// Tool context whose recorded state delta can be committed, the way the
/// runner applies it when the tool's response event is appended.
pub struct TestToolContext {
    invocation_id: String,
    content: Content,
    state: MapState,
    actions: Mutex<EventActions>,
}

impl TestToolContext {
    pub fn new() -> Self {
        Self {
            invocation_id: "inv-1".to_string(),
            content: Content::new("user").with_text("generate a lesson"),
            state: MapState(Mutex::new(HashMap::new())),
            actions: Mutex::new(EventActions::default()),
        }
    }

    /// A context for a later invocation on the same session state.
    pub fn next_invocation(&self, invocation_id: &str) -> Self {
        let state = self.state.0.lock().unwrap().clone();
        Self {
            invocation_id: invocation_id.to_string(),
            state: MapState(Mutex::new(state)),
            ..Self::new()
        }
    }

    pub fn commit(&self) {
        let actions = std::mem::take(&mut *self.actions.lock().unwrap());
        self.state.0.lock().unwrap().extend(actions.state_delta);
    }

    pub fn committed(&self, key: &str) -> Option<Value> {
        self.state.get(key)
    }
}

impl ReadonlyContext for TestToolContext {
    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }
    fn agent_name(&self) -> &str {
        "validator"
    }
    fn user_id(&self) -> &str {
        "user"
    }
    fn app_name(&self) -> &str {
        "lesson-forge"
    }
    fn session_id(&self) -> &str {
        "session-1"
    }
    fn user_content(&self) -> &Content {
        &self.content
    }
}

impl ToolContext for TestToolContext {
    fn function_call_id(&self) -> &str {
        "call-1"
    }
    fn state(&self) -> &dyn State {
        &self.state
    }
    fn actions(&self) -> EventActions {
        self.actions.lock().unwrap().clone()
    }
    fn set_actions(&self, actions: EventActions) {
        *self.actions.lock().unwrap() = actions;
    }
}
