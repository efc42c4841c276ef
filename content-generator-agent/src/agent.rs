use crate::prompts::{
    CODE_GENERATOR_INSTRUCTION, CONTENT_PLANNER_INSTRUCTION, TEMPLATE_ANALYZER_INSTRUCTION,
    VALIDATOR_INSTRUCTION,
};
use content_generator::ContentTools;
use forge_agent::{LlmAgent, LlmAgentBuilder, LoopAgent, SequentialAgent};
use forge_core::{Agent, GenerateContentConfig, IncludeContents, Llm, Result, Tool};
use forge_tool::ExitLoopTool;
use std::sync::Arc;

pub const ROOT_AGENT_NAME: &str = "content_generator";
pub const VALIDATION_LOOP_NAME: &str = "validation_loop";

pub const TEMPLATE_ANALYSIS_KEY: &str = "template_analysis";
pub const LESSON_PLAN_KEY: &str = "lesson_plan";
pub const GENERATED_CODE_SUMMARY_KEY: &str = "generated_code_summary";

/// Model turns the validator may take per available tool in one loop
/// iteration. A repair pass runs each check, rewrites the file, re-runs the
/// failing checks and validates again, so a flat per-agent cap is too low.
pub const VALIDATOR_CALLS_PER_TOOL: u32 = 4;

/// The pipeline root plus a handle on every stage.
#[derive(Clone)]
pub struct ContentGeneratorAgents {
    pub root: Arc<SequentialAgent>,
    pub template_analyzer: Arc<LlmAgent>,
    pub content_planner: Arc<LlmAgent>,
    pub code_generator: Arc<LlmAgent>,
    pub validator: Arc<LlmAgent>,
    pub validation_loop: Arc<LoopAgent>,
}

impl ContentGeneratorAgents {
    pub fn root_agent(&self) -> Arc<dyn Agent> {
        self.root.clone()
    }
}

impl std::fmt::Debug for ContentGeneratorAgents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentGeneratorAgents")
            .field("root", &self.root.name())
            .field("max_repair_cycles", &self.validation_loop.max_iterations())
            .finish()
    }
}

/// Builds analyzer, planner, generator and the validation loop, in that
/// order, under a sequential root.
///
/// The loop runs the validator once for the initial validation plus once per
/// repair cycle, so at most `max_repair_cycles + 1` times; it ends early when
/// the validator calls `exit_loop`.
pub fn build_content_generator(
    model: Arc<dyn Llm>,
    tools: &ContentTools,
    max_repair_cycles: usize,
) -> Result<ContentGeneratorAgents> {
    let template_analyzer = Arc::new(
        stage("template_analyzer", model.clone(), 0.0)
            .description("Analyzes the target project's configuration, lessons, template and progression.")
            .instruction(TEMPLATE_ANALYZER_INSTRUCTION)
            .with_tools(vec![
                tools.analyze_target_project_tool(),
                tools.get_existing_content_tool(),
                tools.read_template_tool(),
                tools.read_progression_plan_tool(),
            ])
            .output_key(TEMPLATE_ANALYSIS_KEY)
            .include_contents(IncludeContents::Default)
            .build()?,
    );

    let content_planner = Arc::new(
        stage("content_planner", model.clone(), 0.5)
            .description("Turns the project analysis into a detailed lesson plan.")
            .instruction(CONTENT_PLANNER_INSTRUCTION)
            .with_tools(vec![tools.read_source_reference_tool()])
            .output_key(LESSON_PLAN_KEY)
            .include_contents(IncludeContents::None)
            .build()?,
    );

    let code_generator = Arc::new(
        stage("code_generator", model.clone(), 0.1)
            .description("Writes the lesson source file from the plan.")
            .instruction(CODE_GENERATOR_INSTRUCTION)
            .with_tools(vec![tools.write_generated_file_tool(), tools.strip_code_fences_tool()])
            .output_key(GENERATED_CODE_SUMMARY_KEY)
            .include_contents(IncludeContents::None)
            .build()?,
    );

    let validator_tools = vec![
        tools.run_ruff_format_tool(),
        tools.run_ruff_check_tool(),
        tools.run_mypy_check_tool(),
        tools.run_pytest_doctest_tool(),
        tools.write_generated_file_tool(),
        tools.validate_generated_content_tool(),
        Arc::new(ExitLoopTool::new()) as Arc<dyn Tool>,
    ];
    let validator_calls = u32::try_from(validator_tools.len())
        .unwrap_or(u32::MAX)
        .saturating_mul(VALIDATOR_CALLS_PER_TOOL);
    let validator = Arc::new(
        stage("validator", model, 0.0)
            .description("Runs ruff, mypy and pytest on the generated file and repairs failures.")
            .instruction(VALIDATOR_INSTRUCTION)
            .with_tools(validator_tools)
            .include_contents(IncludeContents::None)
            .max_model_calls(validator_calls)
            .build()?,
    );

    let max_iterations = u32::try_from(max_repair_cycles).unwrap_or(u32::MAX).saturating_add(1);
    let validation_loop = Arc::new(
        LoopAgent::new(VALIDATION_LOOP_NAME, vec![validator.clone() as Arc<dyn Agent>])
            .with_description("Validates and repairs the generated file in bounded cycles.")
            .with_max_iterations(max_iterations),
    );

    let stages: Vec<Arc<dyn Agent>> = vec![
        template_analyzer.clone(),
        content_planner.clone(),
        code_generator.clone(),
        validation_loop.clone(),
    ];
    let root = Arc::new(
        SequentialAgent::new(ROOT_AGENT_NAME, stages)
            .with_description("Generates a validated Python lesson for a learning project."),
    );

    tracing::debug!(agent.name = ROOT_AGENT_NAME, max_iterations, "built content generator pipeline");

    Ok(ContentGeneratorAgents {
        root,
        template_analyzer,
        content_planner,
        code_generator,
        validator,
        validation_loop,
    })
}

fn stage(name: &str, model: Arc<dyn Llm>, temperature: f32) -> LlmAgentBuilder {
    LlmAgentBuilder::new(name)
        .model(model)
        .generate_content_config(GenerateContentConfig::with_temperature(temperature))
        .disallow_transfer_to_parent(true)
        .disallow_transfer_to_peers(true)
}

trait WithTools {
    fn with_tools(self, tools: Vec<Arc<dyn Tool>>) -> Self;
}

impl WithTools for LlmAgentBuilder {
    fn with_tools(self, tools: Vec<Arc<dyn Tool>>) -> Self {
        tools.into_iter().fold(self, LlmAgentBuilder::tool)
    }
}
