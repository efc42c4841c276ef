//! # content-generator
//!
//! Domain library behind the lesson generation pipeline: it reads target
//! learning projects, writes generated lessons inside them, runs the
//! project's linters and tests against the result and keeps the attempt
//! history that drives the repair loop.
//!
//! ## Overview
//!
//! - [`ProjectRegistry`] - where projects live and the path guard
//! - [`analyzers`] - `pyproject.toml`, existing lessons, templates, progression
//! - [`Validator`] - ruff, mypy and pytest as subprocesses
//! - [`diagnostics`] - structured findings parsed from tool output
//! - [`AttemptHistory`] - bounded repair cycles and feedback text
//! - [`ContentTools`] - the operations exposed to agents as tools
//!
//! ```rust,no_run
//! use content_generator::{ContentTools, GeneratorConfig};
//!
//! let config = GeneratorConfig::from_env().expect("valid configuration");
//! let tools = ContentTools::new(config);
//! println!("{}", tools.get_next_lesson_number("learning-dsa").unwrap());
//! ```

pub mod analyzers;
pub mod builtin_templates;
pub mod config;
pub mod diagnostics;
pub mod domains;
pub mod error;
pub mod models;
pub mod project_registry;
pub mod repair;
pub mod templates;
pub mod tools;
pub mod utils;
pub mod validators;

pub use builtin_templates::builtin_template;
pub use config::{ConfigValidationError, GeneratorConfig};
pub use diagnostics::{Diagnostic, PytestSummary, ToolReport};
pub use domains::{DoctestStrategy, DomainConfig, DomainRegistry};
pub use error::{GeneratorError, Result};
pub use models::{
    AppTemplate, ExistingLesson, GeneratedContent, LessonMetadata, LessonPlan, LessonTemplate,
    PedagogyStyle, ProjectConfig, TargetProject, TemplateCategory, ValidationResult,
    ValidationTool,
};
pub use project_registry::ProjectRegistry;
pub use repair::{AttemptHistory, RepairDecision, ValidationAttempt, render_feedback};
pub use templates::{AppParts, LessonParts};
pub use tools::ContentTools;
pub use utils::strip_code_fences;
pub use validators::{CommandRunner, ProcessRunner, ToolRun, Validator};
