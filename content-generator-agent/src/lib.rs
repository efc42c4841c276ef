//! # content-generator-agent
//!
//! The lesson generation pipeline:
//!
//! 1. `template_analyzer` reads the target project and stores
//!    `template_analysis`
//! 2. `content_planner` turns it into `lesson_plan`
//! 3. `code_generator` writes the file and stores `generated_code_summary`
//! 4. `validation_loop` repeats `validator` until it calls `exit_loop` or
//!    the repair cycles after the initial validation run out
//!
//! ```rust,no_run
//! use content_generator::{ContentTools, GeneratorConfig};
//! use content_generator_agent::build_content_generator;
//! use forge_model::GeminiModel;
//! use std::sync::Arc;
//!
//! # fn main() -> forge_core::Result<()> {
//! let config = GeneratorConfig::from_env().map_err(|e| forge_core::ForgeError::Config(e.to_string()))?;
//! let model = Arc::new(GeminiModel::new("api-key", config.model.clone())?);
//! let cycles = config.max_repair_cycles;
//! let agents = build_content_generator(model, &ContentTools::new(config), cycles)?;
//! # let _ = agents;
//! # Ok(())
//! # }
//! ```

mod agent;
pub mod prompts;

pub use agent::{
    ContentGeneratorAgents, GENERATED_CODE_SUMMARY_KEY, LESSON_PLAN_KEY, ROOT_AGENT_NAME,
    TEMPLATE_ANALYSIS_KEY, VALIDATION_LOOP_NAME, VALIDATOR_CALLS_PER_TOOL, build_content_generator,
};
pub use prompts::{
    CODE_GENERATOR_INSTRUCTION, CONTENT_PLANNER_INSTRUCTION, TEMPLATE_ANALYZER_INSTRUCTION,
    VALIDATOR_INSTRUCTION,
};
