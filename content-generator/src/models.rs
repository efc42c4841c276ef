//! Data types shared across the content generator.

use crate::error::{GeneratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Learning projects lessons can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetProject {
    #[serde(rename = "learning-dsa")]
    Dsa,
    #[serde(rename = "learning-asyncio")]
    Asyncio,
    #[serde(rename = "learning-litestar")]
    Litestar,
    #[serde(rename = "learning-fastapi")]
    Fastapi,
}

impl TargetProject {
    pub const ALL: [TargetProject; 4] =
        [TargetProject::Dsa, TargetProject::Asyncio, TargetProject::Litestar, TargetProject::Fastapi];

    /// The project's directory name under the study base.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetProject::Dsa => "learning-dsa",
            TargetProject::Asyncio => "learning-asyncio",
            TargetProject::Litestar => "learning-litestar",
            TargetProject::Fastapi => "learning-fastapi",
        }
    }

    pub fn category(&self) -> TemplateCategory {
        match self {
            TargetProject::Dsa | TargetProject::Asyncio => TemplateCategory::LessonBased,
            TargetProject::Litestar | TargetProject::Fastapi => TemplateCategory::AppBased,
        }
    }

    pub fn names() -> String {
        Self::ALL.iter().map(TargetProject::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl std::fmt::Display for TargetProject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TargetProject {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s).ok_or_else(|| {
            GeneratorError::UnknownProject { name: s.to_string(), available: Self::names() }
        })
    }
}

/// How a project's content is organized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateCategory {
    /// Standalone lesson modules with doctests (DSA, asyncio).
    LessonBased,
    /// Application code with separate tests (Litestar, FastAPI).
    AppBased,
}

impl TemplateCategory {
    /// Source directories scanned for existing content, in order.
    pub fn source_dirs(&self) -> &'static [&'static str] {
        match self {
            TemplateCategory::LessonBased => &["src"],
            TemplateCategory::AppBased => &["app", "src"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedagogyStyle {
    ConceptFirst,
    IntegrationFirst,
    ApplicationFirst,
}

impl PedagogyStyle {
    pub const ALL: [PedagogyStyle; 3] =
        [PedagogyStyle::ConceptFirst, PedagogyStyle::IntegrationFirst, PedagogyStyle::ApplicationFirst];

    pub fn as_str(&self) -> &'static str {
        match self {
            PedagogyStyle::ConceptFirst => "concept_first",
            PedagogyStyle::IntegrationFirst => "integration_first",
            PedagogyStyle::ApplicationFirst => "application_first",
        }
    }
}

impl std::fmt::Display for PedagogyStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings read from a project's `pyproject.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub python_version: String,
    pub has_doctest_modules: bool,
    pub mypy_strict: bool,
    pub ruff_target_version: String,
    pub source_dirs: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            python_version: "3.10".to_string(),
            has_doctest_modules: false,
            mypy_strict: false,
            ruff_target_version: "py310".to_string(),
            source_dirs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonMetadata {
    pub number: u32,
    pub title: String,
    pub filename: String,
    pub prerequisites: Vec<String>,
    pub narrative: String,
}

/// Template material gathered from a project's `notes/` and `AGENTS.md`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonTemplate {
    pub project: TargetProject,
    pub template_content: String,
    /// Paths relative to the project root.
    pub example_lessons: Vec<String>,
    pub conventions: String,
}

impl LessonTemplate {
    pub fn new(project: TargetProject) -> Self {
        Self {
            project,
            template_content: String::new(),
            example_lessons: Vec::new(),
            conventions: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppTemplate {
    pub project: TargetProject,
    pub app_structure: String,
    pub test_patterns: String,
    pub conventions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub title: String,
    pub topic: String,
    pub lesson_number: u32,
    pub concepts: Vec<String>,
    pub functions: Vec<String>,
    pub doctest_scenarios: Vec<String>,
    pub narrative: String,
}

impl LessonPlan {
    pub fn new(title: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            topic: topic.into(),
            lesson_number: 1,
            concepts: Vec::new(),
            functions: Vec::new(),
            doctest_scenarios: Vec::new(),
            narrative: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub file_path: PathBuf,
    pub content: String,
    pub project: TargetProject,
}

/// A lesson file found in a project's source directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingLesson {
    /// File stem, e.g. `01_arrays`.
    pub name: String,
    /// Path relative to the project root.
    pub path: String,
}

/// External checks run against a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationTool {
    RuffFormat,
    RuffCheck,
    Mypy,
    PytestDoctest,
}

impl ValidationTool {
    /// Every check, in the order validation runs them.
    pub const ALL: [ValidationTool; 4] = [
        ValidationTool::RuffFormat,
        ValidationTool::RuffCheck,
        ValidationTool::Mypy,
        ValidationTool::PytestDoctest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ValidationTool::RuffFormat => "ruff_format",
            ValidationTool::RuffCheck => "ruff_check",
            ValidationTool::Mypy => "mypy",
            ValidationTool::PytestDoctest => "pytest_doctest",
        }
    }

    /// Section heading used in validation reports.
    pub fn label(&self) -> &'static str {
        match self {
            ValidationTool::RuffFormat => "RUFF FORMAT",
            ValidationTool::RuffCheck => "RUFF LINT",
            ValidationTool::Mypy => "MYPY",
            ValidationTool::PytestDoctest => "PYTEST",
        }
    }
}

impl std::fmt::Display for ValidationTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of running every check on one file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    /// One line per failing check.
    pub errors: Vec<String>,
    pub ruff_format: String,
    pub ruff_lint: String,
    pub mypy: String,
    pub pytest: String,
    /// Checks that ran and failed, in run order.
    #[serde(default)]
    pub failed_tools: Vec<ValidationTool>,
}

impl ValidationResult {
    pub fn output(&self, tool: ValidationTool) -> &str {
        match tool {
            ValidationTool::RuffFormat => &self.ruff_format,
            ValidationTool::RuffCheck => &self.ruff_lint,
            ValidationTool::Mypy => &self.mypy,
            ValidationTool::PytestDoctest => &self.pytest,
        }
    }

    pub(crate) fn output_mut(&mut self, tool: ValidationTool) -> &mut String {
        match tool {
            ValidationTool::RuffFormat => &mut self.ruff_format,
            ValidationTool::RuffCheck => &mut self.ruff_lint,
            ValidationTool::Mypy => &mut self.mypy,
            ValidationTool::PytestDoctest => &mut self.pytest,
        }
    }

    pub fn tool_passed(&self, tool: ValidationTool) -> bool {
        !self.failed_tools.contains(&tool)
    }
}
