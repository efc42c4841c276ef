//! Agent-facing operations. Every operation returns plain text for the
//! model; failures surface as tool errors which the agent relays back as
//! `{"error": ...}`.

use crate::analyzers;
use crate::config::{GeneratorConfig, home_dir};
use crate::diagnostics::interpret;
use crate::domains::DomainRegistry;
use crate::error::Result;
use crate::models::{TargetProject, TemplateCategory, ValidationTool};
use crate::project_registry::ProjectRegistry;
use crate::repair::{
    AttemptHistory, FEEDBACK_STATE_KEY, HISTORY_STATE_KEY, MAX_LISTED_DIAGNOSTICS, render_feedback,
};
use crate::utils::strip_code_fences;
use crate::validators::{CommandRunner, ProcessRunner, Validator};
use forge_core::{ForgeError, Tool, ToolContext};
use forge_tool::FunctionTool;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ProjectArgs {
    /// One of: learning-dsa, learning-asyncio, learning-litestar, learning-fastapi.
    pub project_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FileArgs {
    /// One of: learning-dsa, learning-asyncio, learning-litestar, learning-fastapi.
    pub project_name: String,
    /// Path relative to the project root.
    pub relative_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteArgs {
    /// One of: learning-dsa, learning-asyncio, learning-litestar, learning-fastapi.
    pub project_name: String,
    /// Path relative to the project root.
    pub relative_path: String,
    /// The complete file content to write.
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DomainArgs {
    /// Domain identifier, e.g. "dsa" or "asyncio".
    pub domain_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TextArgs {
    /// Raw model output, possibly wrapped in markdown fences.
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArgs {}

struct Inner {
    config: GeneratorConfig,
    registry: ProjectRegistry,
    domains: DomainRegistry,
    validator: Validator,
}

/// Shared handle behind every content generation tool.
#[derive(Clone)]
pub struct ContentTools {
    inner: Arc<Inner>,
}

impl ContentTools {
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    /// Tools whose validation subprocesses go through `runner`.
    pub fn with_runner(config: GeneratorConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let registry = ProjectRegistry::from_config(&config);
        let validator = Validator::new(registry.clone(), runner).with_timeout(config.tool_timeout());
        Self {
            inner: Arc::new(Inner {
                domains: DomainRegistry::builtin(&home_dir()),
                config,
                registry,
                validator,
            }),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &ProjectRegistry {
        &self.inner.registry
    }

    pub fn domains(&self) -> &DomainRegistry {
        &self.inner.domains
    }

    pub fn validator(&self) -> &Validator {
        &self.inner.validator
    }

    pub fn analyze_target_project(&self, project_name: &str) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        info!(project = %project, "analyzing target project");
        let config = analyzers::analyze_project_config(self.registry(), project)?;
        Ok(format!(
            "Project: {}\nPython: {}\nDoctest modules: {}\nMypy strict: {}\nRuff target: {}\nSource dirs: {}",
            config.name,
            config.python_version,
            config.has_doctest_modules,
            config.mypy_strict,
            config.ruff_target_version,
            config.source_dirs.join(", ")
        ))
    }

    pub fn get_existing_content(&self, project_name: &str) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        let lessons = analyzers::analyze_existing_lessons(self.registry(), project)?;
        if lessons.is_empty() {
            return Ok("No existing lessons found.".to_string());
        }
        let lines: Vec<String> =
            lessons.iter().map(|lesson| format!("- {} ({})", lesson.name, lesson.path)).collect();
        Ok(format!("Found {} existing files:\n{}", lessons.len(), lines.join("\n")))
    }

    pub fn read_template(&self, project_name: &str) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        let template = analyzers::extract_template_patterns(self.registry(), project)?;

        let mut parts = Vec::new();
        if !template.template_content.is_empty() {
            parts.push(format!("=== TEMPLATE ===\n{}", template.template_content));
        }
        if !template.conventions.is_empty() {
            parts.push(format!("=== CONVENTIONS ===\n{}", template.conventions));
        }
        if !template.example_lessons.is_empty() {
            parts.push(format!("=== EXAMPLES ===\n{}", template.example_lessons.join("\n")));
        }

        if parts.is_empty() {
            return Ok("No template data found.".to_string());
        }
        Ok(parts.join("\n\n"))
    }

    pub fn read_progression_plan(&self, project_name: &str) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        let text = analyzers::read_progression(self.registry(), project)?;
        if text.is_empty() {
            return Ok("No progression plan found.".to_string());
        }
        Ok(text)
    }

    pub fn read_source_reference(&self, project_name: &str, relative_path: &str) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        let path = self.registry().resolve_in_project(project, relative_path)?;
        analyzers::read_source_file(&path)
    }

    /// Writes fence-stripped `content` and returns the resolved path with the
    /// message for the model.
    pub fn write_generated_file(
        &self,
        project_name: &str,
        relative_path: &str,
        content: &str,
    ) -> Result<(PathBuf, String)> {
        let project: TargetProject = project_name.parse()?;
        let path = self.registry().resolve_in_project(project, relative_path)?;
        let content = strip_code_fences(content);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &content)?;

        info!(project = %project, path = %path.display(), bytes = content.len(), "wrote generated file");
        Ok((path, format!("Successfully wrote {} bytes to {}", content.len(), relative_path)))
    }

    pub fn list_available_domains(&self) -> String {
        let names = self.domains().names();
        if names.is_empty() {
            return "No domains registered.".to_string();
        }
        format!("Available domains: {}", names.join(", "))
    }

    pub fn get_domain_config(&self, domain_name: &str) -> Result<String> {
        let config = self.domains().get(domain_name)?;
        Ok(format!(
            "Domain: {}\nProject: {}\nPedagogy: {}\nLesson dir: {}\nStrict mypy: {}\nDoctest strategy: {}",
            config.name,
            config.project,
            config.pedagogy,
            config.lesson_dir,
            config.strict_mypy,
            config.doctest_strategy
        ))
    }

    pub fn get_next_lesson_number(&self, project_name: &str) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        let number = analyzers::next_lesson_number(self.registry(), project)?;
        Ok(format!("Next lesson number: {}", number))
    }

    /// Runs one check; failures are followed by their parsed diagnostics.
    pub async fn run_check(&self, tool: ValidationTool, project_name: &str, relative_path: &str) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        let file = self.registry().resolve_in_project(project, relative_path)?;
        let project_path = self.registry().project_path(project);

        let run = self.validator().run_tool(tool, &file, Some(&project_path)).await;
        if run.ok {
            return Ok(format!("PASS: {}", run.output));
        }

        let report = interpret(tool, false, &run.output);
        let mut text = format!("FAIL: {}\n\nDiagnostics:", run.output);
        for diagnostic in report.diagnostics.iter().take(MAX_LISTED_DIAGNOSTICS) {
            text.push_str(&format!("\n- {}", diagnostic));
        }
        Ok(text)
    }

    /// Full validation of a generated file, recorded in `history`.
    ///
    /// Doctests only run for lesson-based projects.
    pub async fn validate_generated_content(
        &self,
        project_name: &str,
        relative_path: &str,
        history: &mut AttemptHistory,
    ) -> Result<String> {
        let project: TargetProject = project_name.parse()?;
        let file = self.registry().resolve_in_project(project, relative_path)?;
        let project_path = self.registry().project_path(project);
        let run_doctest = project.category() == TemplateCategory::LessonBased;

        let result = self.validator().validate_file(&file, Some(&project_path), run_doctest).await?;
        history.record(relative_path, &result);

        if result.passed {
            return Ok("PASS: All validation checks passed.".to_string());
        }

        let sections: Vec<String> = ValidationTool::ALL
            .iter()
            .map(|tool| (tool.label(), result.output(*tool)))
            .filter(|(_, output)| !output.is_empty())
            .map(|(label, output)| format!("{}:\n{}", label, output))
            .collect();
        let body = if sections.is_empty() { result.errors.join("\n") } else { sections.join("\n---\n") };

        Ok(format!("FAIL:\n{}\n\n=== REPAIR FEEDBACK ===\n{}", body, render_feedback(history)))
    }

    pub fn analyze_target_project_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<ProjectArgs>(
            "analyze_target_project",
            "Analyze a target project's configuration and conventions: reads pyproject.toml and scans source directories.",
            |tools, args| tools.analyze_target_project(&args.project_name),
        )
    }

    pub fn get_existing_content_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<ProjectArgs>(
            "get_existing_content",
            "List existing lesson files in a target project.",
            |tools, args| tools.get_existing_content(&args.project_name),
        )
    }

    pub fn read_template_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<ProjectArgs>(
            "read_template",
            "Read the lesson template and conventions for a target project.",
            |tools, args| tools.read_template(&args.project_name),
        )
    }

    pub fn read_progression_plan_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<ProjectArgs>(
            "read_progression_plan",
            "Read progression plan files for a target project.",
            |tools, args| tools.read_progression_plan(&args.project_name),
        )
    }

    pub fn read_source_reference_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<FileArgs>(
            "read_source_reference",
            "Read a source file from a target project for reference.",
            |tools, args| tools.read_source_reference(&args.project_name, &args.relative_path),
        )
    }

    pub fn strip_code_fences_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<TextArgs>(
            "strip_code_fences",
            "Remove markdown code fences wrapping generated code.",
            |_, args| Ok(strip_code_fences(&args.text)),
        )
    }

    pub fn list_available_domains_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<NoArgs>(
            "list_available_domains",
            "List all registered content generation domains.",
            |tools, _| Ok(tools.list_available_domains()),
        )
    }

    pub fn get_domain_config_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<DomainArgs>(
            "get_domain_config",
            "Get the configuration for a content generation domain.",
            |tools, args| tools.get_domain_config(&args.domain_name),
        )
    }

    pub fn get_next_lesson_number_tool(&self) -> Arc<dyn Tool> {
        self.text_tool::<ProjectArgs>(
            "get_next_lesson_number",
            "Determine the next lesson number for a target project.",
            |tools, args| tools.get_next_lesson_number(&args.project_name),
        )
    }

    /// Writes the file and records `last_written_file` and
    /// `last_written_project` in session state. The first write of a new
    /// invocation clears attempt history left by an earlier run.
    pub fn write_generated_file_tool(&self) -> Arc<dyn Tool> {
        let tools = self.clone();
        let tool = FunctionTool::new(
            "write_generated_file",
            "Write generated content to a file in a target project.",
            move |ctx: Arc<dyn ToolContext>, args: Value| {
                let tools = tools.clone();
                async move {
                    let args: WriteArgs = parse_args("write_generated_file", args)?;
                    let (path, message) =
                        tools.write_generated_file(&args.project_name, &args.relative_path, &args.content)?;
                    ctx.set_state("last_written_file", Value::String(path.display().to_string()));
                    ctx.set_state("last_written_project", Value::String(args.project_name));
                    let previous = ctx.state().get(HISTORY_STATE_KEY);
                    if AttemptHistory::is_stale(previous.as_ref(), ctx.invocation_id()) {
                        ctx.set_state(HISTORY_STATE_KEY, Value::Null);
                        ctx.set_state(FEEDBACK_STATE_KEY, Value::String(String::new()));
                    }
                    Ok(Value::String(message))
                }
            },
        )
        .with_parameters_schema::<WriteArgs>();
        Arc::new(tool)
    }

    /// Full validation. The attempt history is read from and written back
    /// to session state so it accumulates across loop iterations of one
    /// invocation.
    pub fn validate_generated_content_tool(&self) -> Arc<dyn Tool> {
        let tools = self.clone();
        let tool = FunctionTool::new(
            "validate_generated_content",
            "Run full validation (ruff, mypy, pytest) on a generated file. Returns PASS or detailed errors with repair feedback.",
            move |ctx: Arc<dyn ToolContext>, args: Value| {
                let tools = tools.clone();
                async move {
                    let args: FileArgs = parse_args("validate_generated_content", args)?;
                    let mut history = AttemptHistory::from_state_for_run(
                        ctx.state().get(HISTORY_STATE_KEY),
                        tools.config().max_repair_cycles,
                        ctx.invocation_id(),
                    );
                    let text = tools
                        .validate_generated_content(&args.project_name, &args.relative_path, &mut history)
                        .await?;
                    ctx.set_state(HISTORY_STATE_KEY, history.to_state());
                    ctx.set_state(FEEDBACK_STATE_KEY, Value::String(render_feedback(&history)));
                    Ok(Value::String(text))
                }
            },
        )
        .with_parameters_schema::<FileArgs>();
        Arc::new(tool)
    }

    pub fn run_ruff_format_tool(&self) -> Arc<dyn Tool> {
        self.check_tool(ValidationTool::RuffFormat, "run_ruff_format", "Run ruff format --check on a generated file.")
    }

    pub fn run_ruff_check_tool(&self) -> Arc<dyn Tool> {
        self.check_tool(ValidationTool::RuffCheck, "run_ruff_check", "Run ruff check on a generated file.")
    }

    pub fn run_mypy_check_tool(&self) -> Arc<dyn Tool> {
        self.check_tool(ValidationTool::Mypy, "run_mypy_check", "Run mypy on a generated file.")
    }

    pub fn run_pytest_doctest_tool(&self) -> Arc<dyn Tool> {
        self.check_tool(
            ValidationTool::PytestDoctest,
            "run_pytest_doctest",
            "Run pytest --doctest-modules on a generated file.",
        )
    }

    /// Every tool this crate provides.
    pub fn all_tools(&self) -> Vec<Arc<dyn Tool>> {
        vec![
            self.analyze_target_project_tool(),
            self.get_existing_content_tool(),
            self.read_template_tool(),
            self.read_progression_plan_tool(),
            self.read_source_reference_tool(),
            self.write_generated_file_tool(),
            self.strip_code_fences_tool(),
            self.validate_generated_content_tool(),
            self.run_ruff_format_tool(),
            self.run_ruff_check_tool(),
            self.run_mypy_check_tool(),
            self.run_pytest_doctest_tool(),
            self.list_available_domains_tool(),
            self.get_domain_config_tool(),
            self.get_next_lesson_number_tool(),
        ]
    }

    fn text_tool<A>(
        &self,
        name: &'static str,
        description: &'static str,
        op: fn(&ContentTools, A) -> Result<String>,
    ) -> Arc<dyn Tool>
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
    {
        let tools = self.clone();
        let tool = FunctionTool::new(name, description, move |_ctx: Arc<dyn ToolContext>, args: Value| {
            let tools = tools.clone();
            async move {
                let args: A = parse_args(name, args)?;
                Ok(Value::String(op(&tools, args)?))
            }
        })
        .with_parameters_schema::<A>();
        Arc::new(tool)
    }

    fn check_tool(&self, check: ValidationTool, name: &'static str, description: &'static str) -> Arc<dyn Tool> {
        let tools = self.clone();
        let tool = FunctionTool::new(name, description, move |_ctx: Arc<dyn ToolContext>, args: Value| {
            let tools = tools.clone();
            async move {
                let args: FileArgs = parse_args(name, args)?;
                let text = tools.run_check(check, &args.project_name, &args.relative_path).await?;
                Ok(Value::String(text))
            }
        })
        .with_parameters_schema::<FileArgs>();
        Arc::new(tool)
    }
}

fn parse_args<A: DeserializeOwned>(tool: &str, args: Value) -> forge_core::Result<A> {
    let args = if args.is_null() { Value::Object(Default::default()) } else { args };
    serde_json::from_value(args)
        .map_err(|e| ForgeError::Tool(format!("Invalid arguments for {}: {}", tool, e)))
}
